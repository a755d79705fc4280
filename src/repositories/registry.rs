//! Registry access - thin wrapper over winreg.

use super::{normalize_path, KeyAccess, RegistryKey, RegistryStore};
use crate::config::{Hive, RegistryView};
use crate::domain::{RegistryValue, ValueKind};
use crate::error::{ParameterError, Result};
use std::io;
use winreg::enums::{
    RegType, HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
    HKEY_USERS, KEY_READ, KEY_WOW64_32KEY, KEY_WOW64_64KEY, KEY_WRITE,
};
use winreg::{RegKey, RegValue, HKEY};

#[derive(Debug, Clone, Copy, Default)]
pub struct WinRegStore {
    hive: Hive,
    view: RegistryView,
}

impl WinRegStore {
    #[must_use]
    pub const fn new(hive: Hive, view: RegistryView) -> Self {
        Self { hive, view }
    }

    #[must_use]
    pub const fn current_user() -> Self {
        Self::new(Hive::CurrentUser, RegistryView::Default)
    }

    fn root(&self) -> RegKey {
        let hkey: HKEY = match self.hive {
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::Users => HKEY_USERS,
            Hive::CurrentConfig => HKEY_CURRENT_CONFIG,
        };
        RegKey::predef(hkey)
    }

    fn flags(&self, access: KeyAccess) -> u32 {
        let access = match access {
            KeyAccess::Read => KEY_READ,
            KeyAccess::Write => KEY_READ | KEY_WRITE,
        };
        match self.view {
            RegistryView::Default => access,
            RegistryView::Registry32 => access | KEY_WOW64_32KEY,
            RegistryView::Registry64 => access | KEY_WOW64_64KEY,
        }
    }
}

impl RegistryStore for WinRegStore {
    type Key = WinRegKey;

    fn open_key(&self, path: &str, access: KeyAccess) -> Result<Option<WinRegKey>> {
        let path = normalize_path(path);
        log::debug!("open {}\\{} ({:?})", self.hive.as_str(), path, access);
        match self.root().open_subkey_with_flags(&path, self.flags(access)) {
            Ok(key) => Ok(Some(WinRegKey(key))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ParameterError::Registry(format!("{}: {}", path, e))),
        }
    }

    fn create_key(&self, path: &str) -> Result<WinRegKey> {
        let path = normalize_path(path);
        log::debug!("create {}\\{}", self.hive.as_str(), path);
        let (key, _) = self
            .root()
            .create_subkey_with_flags(&path, self.flags(KeyAccess::Write))
            .map_err(|e| ParameterError::Registry(format!("{}: {}", path, e)))?;
        Ok(WinRegKey(key))
    }
}

pub struct WinRegKey(RegKey);

impl RegistryKey for WinRegKey {
    fn get_value(&self, name: &str) -> Result<Option<RegistryValue>> {
        match self.0.get_raw_value(name) {
            Ok(raw) => Ok(Some(RegistryValue::from_raw(kind_of(&raw.vtype), &raw.bytes))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ParameterError::Registry(format!("{}: {}", name, e))),
        }
    }

    fn set_value(&self, name: &str, value: &RegistryValue) -> Result {
        let (kind, bytes) = value.to_raw();
        let raw = RegValue {
            bytes: bytes.into(),
            vtype: reg_type(kind)?,
        };
        self.0
            .set_raw_value(name, &raw)
            .map_err(|e| ParameterError::Registry(format!("{}: {}", name, e)))
    }

    fn value_names(&self) -> Result<Vec<String>> {
        self.0
            .enum_values()
            .map(|entry| entry.map(|(name, _)| name))
            .collect::<io::Result<Vec<_>>>()
            .map_err(|e| ParameterError::Registry(e.to_string()))
    }
}

fn kind_of(vtype: &RegType) -> ValueKind {
    match vtype {
        RegType::REG_NONE => ValueKind::None,
        RegType::REG_SZ => ValueKind::String,
        RegType::REG_EXPAND_SZ => ValueKind::ExpandString,
        RegType::REG_BINARY => ValueKind::Binary,
        RegType::REG_DWORD => ValueKind::Dword,
        RegType::REG_DWORD_BIG_ENDIAN => ValueKind::DwordBigEndian,
        RegType::REG_LINK => ValueKind::Link,
        RegType::REG_MULTI_SZ => ValueKind::MultiString,
        RegType::REG_RESOURCE_LIST => ValueKind::ResourceList,
        RegType::REG_FULL_RESOURCE_DESCRIPTOR => ValueKind::FullResourceDescriptor,
        RegType::REG_RESOURCE_REQUIREMENTS_LIST => ValueKind::ResourceRequirementsList,
        RegType::REG_QWORD => ValueKind::Qword,
        #[allow(unreachable_patterns)]
        _ => ValueKind::Binary,
    }
}

fn reg_type(kind: ValueKind) -> Result<RegType> {
    Ok(match kind {
        ValueKind::None => RegType::REG_NONE,
        ValueKind::String => RegType::REG_SZ,
        ValueKind::ExpandString => RegType::REG_EXPAND_SZ,
        ValueKind::Binary => RegType::REG_BINARY,
        ValueKind::Dword => RegType::REG_DWORD,
        ValueKind::DwordBigEndian => RegType::REG_DWORD_BIG_ENDIAN,
        ValueKind::Link => RegType::REG_LINK,
        ValueKind::MultiString => RegType::REG_MULTI_SZ,
        ValueKind::ResourceList => RegType::REG_RESOURCE_LIST,
        ValueKind::FullResourceDescriptor => RegType::REG_FULL_RESOURCE_DESCRIPTOR,
        ValueKind::ResourceRequirementsList => RegType::REG_RESOURCE_REQUIREMENTS_LIST,
        ValueKind::Qword => RegType::REG_QWORD,
        ValueKind::Unknown(code) => {
            return Err(ParameterError::Unsupported(format!(
                "registry value type {code}"
            )))
        }
    })
}
