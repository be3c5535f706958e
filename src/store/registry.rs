use crate::store::{EntryCursor, SensorStore, StoreError};

/// Values under a `HKEY_CURRENT_USER` subkey. Only backed by the registry on
/// Windows; other platforms report the backend as unsupported.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: String,
}

impl RegistryStore {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl SensorStore for RegistryStore {
    fn namespace(&self) -> String {
        format!(r"HKCU\{}", self.path)
    }

    #[cfg(windows)]
    fn open(&self) -> Result<Box<dyn EntryCursor + '_>, StoreError> {
        windows::open(self)
    }

    #[cfg(not(windows))]
    fn open(&self) -> Result<Box<dyn EntryCursor + '_>, StoreError> {
        Err(StoreError::Unsupported("registry".to_string()))
    }
}

#[cfg(windows)]
mod windows {
    use super::RegistryStore;
    use crate::models::sensor::{RawEntry, RawValue};
    use crate::store::{EntryCursor, SensorStore, StoreError};
    use std::io;
    use winreg::enums::{RegType, HKEY_CURRENT_USER};
    use winreg::types::FromRegValue;
    use winreg::{RegKey, RegValue};

    pub(super) fn open(store: &RegistryStore) -> Result<Box<dyn EntryCursor + '_>, StoreError> {
        let key = RegKey::predef(HKEY_CURRENT_USER)
            .open_subkey(&store.path)
            .map_err(|source| StoreError::NamespaceUnavailable {
                namespace: store.namespace(),
                source,
            })?;

        // The value iterator borrows the key, so take the listing up front.
        let values: Vec<io::Result<(String, RegValue)>> = key.enum_values().collect();
        Ok(Box::new(RegistryCursor {
            values: values.into_iter(),
            position: 0,
        }))
    }

    struct RegistryCursor {
        values: std::vec::IntoIter<io::Result<(String, RegValue)>>,
        position: usize,
    }

    impl EntryCursor for RegistryCursor {
        fn next_entry(&mut self) -> Result<Option<RawEntry>, StoreError> {
            match self.values.next() {
                None => Ok(None),
                Some(Err(source)) => Err(StoreError::Enumeration {
                    position: self.position,
                    source,
                }),
                Some(Ok((name, value))) => {
                    self.position += 1;
                    Ok(Some(RawEntry::new(name, convert(&value))))
                }
            }
        }
    }

    fn convert(value: &RegValue) -> RawValue {
        match value.vtype {
            RegType::REG_DWORD => u32::from_reg_value(value)
                .map(RawValue::from)
                .unwrap_or_else(|_| RawValue::Text(value.to_string())),
            RegType::REG_QWORD => u64::from_reg_value(value)
                .map(RawValue::from)
                .unwrap_or_else(|_| RawValue::Text(value.to_string())),
            _ => String::from_reg_value(value)
                .map(RawValue::Text)
                .unwrap_or_else(|_| RawValue::Text(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_is_rooted_at_current_user() {
        let store = RegistryStore::new(r"Software\HWiNFO64\VSB");
        assert_eq!(store.namespace(), r"HKCU\Software\HWiNFO64\VSB");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_unsupported_off_windows() {
        let store = RegistryStore::new("Software");
        assert!(matches!(store.open(), Err(StoreError::Unsupported(_))));
    }
}
