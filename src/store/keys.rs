use crate::store::StoreError;

const MAX_KEY_LEN: usize = 255;

fn validate_key_part(entity: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{entity} must not be empty")));
    }
    if value.len() > MAX_KEY_LEN {
        return Err(StoreError::Validation(format!(
            "{entity} exceeds {MAX_KEY_LEN} bytes"
        )));
    }
    Ok(())
}

/// Users are keyed by their raw id, so tree order is the pagination order.
pub fn user_key(user_id: &str) -> Result<String, StoreError> {
    validate_key_part("user id", user_id)?;
    Ok(user_id.to_string())
}

pub fn checkpoint_key(name: &str) -> Result<String, StoreError> {
    validate_key_part("checkpoint name", name)?;
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keys_are_rejected() {
        assert!(matches!(user_key(""), Err(StoreError::Validation(_))));
        assert!(matches!(checkpoint_key(""), Err(StoreError::Validation(_))));
    }

    #[test]
    fn oversized_keys_are_rejected() {
        let long = "x".repeat(MAX_KEY_LEN + 1);
        assert!(user_key(&long).is_err());
        assert_eq!(user_key("alice").unwrap(), "alice");
    }
}
