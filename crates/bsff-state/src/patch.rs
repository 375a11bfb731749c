//! # Partial Updates
//!
//! Edits arrive as partial JSON objects. [`merge_patch`] overlays them on
//! the persisted snapshot so that rule evaluation always sees a complete
//! entity: keys absent from the patch keep their persisted value and never
//! register as changes. Objects merge recursively; arrays and scalars
//! replace the persisted value wholesale, and an explicit `null` clears it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Overlay `patch` on `persisted` and deserialize the result.
pub fn merge_patch<T>(persisted: &T, patch: &Value) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut base = serde_json::to_value(persisted)?;
    merge_value(&mut base, patch);
    serde_json::from_value(base)
}

/// Recursively merge `patch` into `base`.
pub fn merge_value(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                let nested = value.is_object() && target.get(key).is_some_and(Value::is_object);
                if !nested {
                    target.insert(key.clone(), value.clone());
                } else if let Some(existing) = target.get_mut(key) {
                    merge_value(existing, value);
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}
