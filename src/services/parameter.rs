//! Registry parameter operations: read, set and create a value and its
//! additions, with a policy refresh after `set_*`.

use crate::config::{AdditionsRefresh, MissingKeyPolicy, ParameterConfig};
use crate::domain::{RegistryValue, SimpleParameter};
use crate::error::{ParameterError, Result};
use crate::repositories::{KeyAccess, ProcessRunner, RegistryKey, RegistryStore};
use crate::utils;

#[cfg(windows)]
use crate::repositories::{CommandRunner, WinRegStore};

/// A registry parameter bound to a store, plus its sibling additions.
///
/// Every operation opens the key it needs, performs its reads or writes and
/// releases the key before returning. Writes re-read the registry so
/// [`value`](Self::value) and [`additions`](Self::additions) reflect what the
/// host actually stored.
#[derive(Debug)]
pub struct WindowsParameter<S, R> {
    record: SimpleParameter,
    additions: Vec<SimpleParameter>,
    store: S,
    runner: R,
    config: ParameterConfig,
}

impl<S: RegistryStore, R: ProcessRunner> WindowsParameter<S, R> {
    pub fn new(record: SimpleParameter, store: S, runner: R) -> Self {
        Self {
            record,
            additions: Vec::new(),
            store,
            runner,
            config: ParameterConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ParameterConfig) -> Self {
        self.config = config;
        self
    }

    /// Parameter that starts out holding `additions`, e.g. values to be
    /// written later.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless `record` has both a path and a value.
    pub fn with_additions(
        record: SimpleParameter,
        additions: Vec<SimpleParameter>,
        store: S,
        runner: R,
    ) -> Result<Self> {
        if record.path().is_none() {
            return Err(ParameterError::invalid("An empty path was passed"));
        }
        if record.value().is_none() {
            return Err(ParameterError::invalid("An empty value was passed"));
        }
        let mut param = Self::new(record, store, runner);
        param.additions = additions;
        Ok(param)
    }

    pub fn record(&self) -> &SimpleParameter {
        &self.record
    }

    pub fn path(&self) -> Option<&str> {
        self.record.path()
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    pub fn value(&self) -> Option<&RegistryValue> {
        self.record.value()
    }

    pub fn additions(&self) -> &[SimpleParameter] {
        &self.additions
    }

    pub fn config(&self) -> &ParameterConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    // === Value operations ===

    /// Read the value from the registry and remember it.
    ///
    /// A missing key or value is not an error: the result is `None`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the parameter has no path, or `Registry`
    /// if the host refuses the read.
    pub fn get_value(&mut self) -> Result<Option<RegistryValue>> {
        let path = self.require_path()?;
        let value = match self.store.open_key(&path, KeyAccess::Read)? {
            Some(key) => key.get_value(self.record.name())?,
            None => None,
        };

        log::debug!("{}\\{} = {:?}", path, self.record.name(), value);
        self.record.replace_value(value.clone());
        Ok(value)
    }

    /// Write `new_value` to an existing key, re-read it and refresh policy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a missing path or a value the registry
    /// cannot store faithfully (see [`RegistryValue::check_writable`]), and
    /// `NotFound` if the key does not exist under [`MissingKeyPolicy::Fail`].
    pub fn set_value(&mut self, new_value: impl Into<RegistryValue>) -> Result {
        let new_value = new_value.into();
        new_value.check_writable()?;
        let path = self.require_path()?;

        {
            let key = self.open_for_write(&path)?;
            key.set_value(self.record.name(), &new_value)?;
        }
        log::info!("Set {}\\{} = {}", path, self.record.name(), new_value);

        self.get_value()?;
        self.refresh_policy();
        Ok(())
    }

    /// Create the key if needed, write `value` and re-read it. No policy refresh.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a missing path or an unwritable value, or
    /// `Registry` if the key cannot be created or written.
    pub fn create_parameter(&mut self, value: impl Into<RegistryValue>) -> Result {
        let value = value.into();
        value.check_writable()?;
        let path = self.require_path()?;
        self.warn_if_unelevated();

        {
            let key = self.store.create_key(&path)?;
            key.set_value(self.record.name(), &value)?;
        }
        log::info!("Created {}\\{} = {}", path, self.record.name(), value);

        self.get_value()?;
        Ok(())
    }

    // === Additions operations ===

    /// Enumerate every value under `additions_path` into the additions list.
    ///
    /// With [`AdditionsRefresh::Append`] the entries are appended, so reading
    /// the same path twice holds each value twice. With
    /// [`AdditionsRefresh::Replace`] the list is rebuilt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `additions_path` is empty.
    pub fn get_additions(&mut self, additions_path: &str) -> Result<&[SimpleParameter]> {
        if additions_path.is_empty() {
            return Err(ParameterError::invalid("An empty additions path was passed"));
        }

        let found = match self.store.open_key(additions_path, KeyAccess::Read)? {
            Some(key) => key
                .value_names()?
                .into_iter()
                .map(|name| -> Result<SimpleParameter> {
                    let value = key.get_value(&name)?;
                    Ok(SimpleParameter::from_registry(additions_path, name, value))
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        log::debug!("{} additions under {}", found.len(), additions_path);

        match self.config.additions_refresh {
            AdditionsRefresh::Append => self.additions.extend(found),
            AdditionsRefresh::Replace => self.additions = found,
        }
        Ok(&self.additions)
    }

    /// Write every addition under the first addition's path, re-read that
    /// path and refresh policy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `additions` is empty, the first has no
    /// path or any has no value; `NotFound` if the key does not exist under
    /// [`MissingKeyPolicy::Fail`].
    pub fn set_additions(&mut self, additions: &[SimpleParameter]) -> Result {
        let path = additions_path(additions)?;

        {
            let key = self.open_for_write(&path)?;
            write_all(&key, additions)?;
        }
        log::info!("Set {} additions under {}", additions.len(), path);

        self.get_additions(&path)?;
        self.refresh_policy();
        Ok(())
    }

    /// Create the first addition's key if needed, write every addition and
    /// re-read that path. No policy refresh.
    ///
    /// # Errors
    ///
    /// Same validation as [`set_additions`](Self::set_additions).
    pub fn create_additions(&mut self, additions: &[SimpleParameter]) -> Result {
        let path = additions_path(additions)?;
        self.warn_if_unelevated();

        {
            let key = self.store.create_key(&path)?;
            write_all(&key, additions)?;
        }
        log::info!("Created {} additions under {}", additions.len(), path);

        self.get_additions(&path)?;
        Ok(())
    }

    // === Helpers ===

    fn require_path(&self) -> Result<String> {
        self.record
            .path()
            .map(str::to_string)
            .ok_or_else(|| ParameterError::invalid("The parameter has no registry path"))
    }

    fn open_for_write(&self, path: &str) -> Result<S::Key> {
        self.warn_if_unelevated();
        if let Some(key) = self.store.open_key(path, KeyAccess::Write)? {
            return Ok(key);
        }
        match self.config.missing_key {
            MissingKeyPolicy::Fail => Err(ParameterError::NotFound(format!(
                "{}\\{}",
                self.config.hive.as_str(),
                path
            ))),
            MissingKeyPolicy::Create => {
                log::info!("Creating missing key {}", path);
                self.store.create_key(path)
            }
        }
    }

    fn warn_if_unelevated(&self) {
        if self.config.hive.is_machine_wide() && !utils::is_admin() {
            log::warn!(
                "Writing to {} without administrator privileges",
                self.config.hive.as_str()
            );
        }
    }

    /// Launch the configured policy refresh. Failures are logged only.
    fn refresh_policy(&self) {
        let refresh = &self.config.policy_refresh;
        if !refresh.enabled {
            log::debug!("Policy refresh disabled");
            return;
        }
        match self.runner.launch(&refresh.program, &refresh.args) {
            Ok(()) => log::info!("Launched {} {}", refresh.program, refresh.args.join(" ")),
            Err(e) => log::warn!("Policy refresh failed: {}", e),
        }
    }
}

/// Parameter backed by the live registry and real process launches.
#[cfg(windows)]
pub type SystemParameter = WindowsParameter<WinRegStore, CommandRunner>;

#[cfg(windows)]
impl SystemParameter {
    /// Open `record` against the hive and view named in `config`.
    pub fn system(record: SimpleParameter, config: ParameterConfig) -> Self {
        let store = WinRegStore::new(config.hive, config.view);
        Self::new(record, store, CommandRunner).with_config(config)
    }
}

fn additions_path(additions: &[SimpleParameter]) -> Result<String> {
    let first = additions
        .first()
        .ok_or_else(|| ParameterError::invalid("An empty additions was passed"))?;
    let path = first
        .path()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ParameterError::invalid("An empty path to additions was passed"))?;

    for addition in additions {
        match addition.value() {
            Some(value) => value.check_writable()?,
            None => {
                return Err(ParameterError::invalid(format!(
                    "Addition '{}' has no value",
                    addition.name()
                )))
            }
        }
    }
    Ok(path.to_string())
}

fn write_all<K: RegistryKey>(key: &K, additions: &[SimpleParameter]) -> Result {
    for addition in additions {
        if let Some(value) = addition.value() {
            key.set_value(addition.name(), value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MemoryStore, RecordingRunner};

    const APP: &str = r"Software\Acme\App";
    const DETAILS: &str = r"Software\Acme\App\Details";

    type TestParameter = WindowsParameter<MemoryStore, RecordingRunner>;

    fn parameter(record: SimpleParameter) -> (TestParameter, MemoryStore, RecordingRunner) {
        let store = MemoryStore::new();
        let runner = RecordingRunner::new();
        let param = WindowsParameter::new(record, store.clone(), runner.clone());
        (param, store, runner)
    }

    fn timeout() -> (TestParameter, MemoryStore, RecordingRunner) {
        parameter(SimpleParameter::new(APP, "Timeout", 30u32).unwrap())
    }

    fn details() -> Vec<SimpleParameter> {
        vec![
            SimpleParameter::new(DETAILS, "Retries", 3u32).unwrap(),
            SimpleParameter::new(DETAILS, "Mode", "fast").unwrap(),
        ]
    }

    #[test]
    fn get_value_on_unwritten_parameter_is_none() {
        let (mut param, _, _) = timeout();
        assert_eq!(param.get_value().unwrap(), None);
        assert_eq!(param.value(), None);
    }

    #[test]
    fn get_value_without_path_is_invalid() {
        let (mut param, _, _) = parameter(SimpleParameter::with_value("Timeout", 30u32).unwrap());
        assert!(param.get_value().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn set_value_round_trips_and_refreshes_policy_once() {
        let (mut param, store, runner) = timeout();
        store.create_key(APP).unwrap();

        param.set_value("60").unwrap();

        assert_eq!(param.value(), Some(&RegistryValue::from("60")));
        assert_eq!(param.get_value().unwrap(), Some(RegistryValue::from("60")));
        assert_eq!(runner.count(), 1);
        let launch = &runner.launches()[0];
        assert_eq!(launch.program, "gpupdate.exe");
        assert_eq!(launch.args, vec!["/force".to_string()]);
    }

    #[test]
    fn set_value_on_missing_key_is_not_found() {
        let (mut param, store, runner) = timeout();
        let err = param.set_value("60").unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.contains_key(APP));
        assert_eq!(runner.count(), 0);
    }

    #[test]
    fn set_value_can_create_missing_key() {
        let (param, store, runner) = timeout();
        let config = ParameterConfig {
            missing_key: MissingKeyPolicy::Create,
            ..ParameterConfig::default()
        };
        let mut param = param.with_config(config);

        param.set_value(60u32).unwrap();
        assert_eq!(store.value(APP, "Timeout"), Some(RegistryValue::Dword(60)));
        assert_eq!(runner.count(), 1);
    }

    #[test]
    fn set_value_rejects_empty_value() {
        let (mut param, store, runner) = timeout();
        store.create_key(APP).unwrap();
        assert!(param.set_value("").unwrap_err().is_invalid_argument());
        assert!(param
            .set_value(RegistryValue::None)
            .unwrap_err()
            .is_invalid_argument());
        assert_eq!(runner.count(), 0);
    }

    #[test]
    fn failed_policy_refresh_does_not_fail_the_write() {
        let store = MemoryStore::new();
        store.create_key(APP).unwrap();
        let runner = RecordingRunner::failing();
        let mut param = WindowsParameter::new(
            SimpleParameter::with_path(APP, "Timeout").unwrap(),
            store,
            runner.clone(),
        );

        param.set_value("60").unwrap();
        assert_eq!(runner.count(), 1);
    }

    #[test]
    fn disabled_policy_refresh_launches_nothing() {
        let (param, store, runner) = timeout();
        store.create_key(APP).unwrap();
        let mut param = param.with_config(ParameterConfig::default().without_policy_refresh());

        param.set_value("60").unwrap();
        assert_eq!(runner.count(), 0);
    }

    #[test]
    fn create_parameter_is_idempotent_and_skips_refresh() {
        let (mut param, store, runner) = timeout();

        param.create_parameter("45").unwrap();
        assert_eq!(param.get_value().unwrap(), Some(RegistryValue::from("45")));

        param.create_parameter("90").unwrap();
        assert_eq!(param.get_value().unwrap(), Some(RegistryValue::from("90")));
        assert_eq!(store.value(APP, "Timeout"), Some(RegistryValue::from("90")));
        assert_eq!(runner.count(), 0);
    }

    #[test]
    fn create_parameter_rejects_empty_value() {
        let (mut param, store, _) = timeout();
        assert!(param.create_parameter("").unwrap_err().is_invalid_argument());
        assert!(!store.contains_key(APP));
    }

    #[test]
    fn get_additions_rejects_empty_path() {
        let (mut param, _, _) = timeout();
        assert!(param.get_additions("").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn get_additions_on_missing_key_is_empty() {
        let (mut param, _, _) = timeout();
        assert!(param.get_additions(DETAILS).unwrap().is_empty());
    }

    #[test]
    fn get_additions_appends_on_every_call() {
        let (mut param, store, _) = timeout();
        let key = store.create_key(DETAILS).unwrap();
        key.set_value("Retries", &RegistryValue::Dword(3)).unwrap();
        key.set_value("Mode", &"fast".into()).unwrap();
        drop(key);

        let first = param.get_additions(DETAILS).unwrap().len();
        let second = param.get_additions(DETAILS).unwrap().len();
        assert_eq!(first, 2);
        assert_eq!(second, 2 * first);
        assert_eq!(param.additions()[0], param.additions()[2]);
    }

    #[test]
    fn get_additions_replaces_when_configured() {
        let (param, _, _) = timeout();
        let config = ParameterConfig {
            additions_refresh: AdditionsRefresh::Replace,
            ..ParameterConfig::default()
        };
        let mut param = param.with_config(config);
        param.create_additions(&details()).unwrap();

        assert_eq!(param.get_additions(DETAILS).unwrap().len(), 2);
        assert_eq!(param.get_additions(DETAILS).unwrap().len(), 2);
    }

    #[test]
    fn get_additions_reads_names_and_values() {
        let (mut param, store, _) = timeout();
        let key = store.create_key(DETAILS).unwrap();
        key.set_value("Retries", &RegistryValue::Dword(3)).unwrap();
        drop(key);

        let additions = param.get_additions(DETAILS).unwrap();
        assert_eq!(additions.len(), 1);
        assert_eq!(additions[0].path(), Some(DETAILS));
        assert_eq!(additions[0].name(), "Retries");
        assert_eq!(additions[0].value(), Some(&RegistryValue::Dword(3)));
    }

    #[test]
    fn batch_writes_reject_empty_list_and_missing_first_path() {
        let (mut param, _, runner) = timeout();
        let pathless = vec![SimpleParameter::with_value("Retries", 3u32).unwrap()];

        assert!(param.set_additions(&[]).unwrap_err().is_invalid_argument());
        assert!(param.create_additions(&[]).unwrap_err().is_invalid_argument());
        assert!(param.set_additions(&pathless).unwrap_err().is_invalid_argument());
        assert!(param
            .create_additions(&pathless)
            .unwrap_err()
            .is_invalid_argument());
        assert_eq!(runner.count(), 0);
    }

    #[test]
    fn batch_writes_reject_additions_without_value() {
        let (mut param, store, _) = timeout();
        let mut additions = details();
        additions.push(SimpleParameter::with_path(DETAILS, "Unset").unwrap());

        assert!(param
            .create_additions(&additions)
            .unwrap_err()
            .is_invalid_argument());
        assert!(!store.contains_key(DETAILS));
    }

    #[test]
    fn set_additions_writes_everything_at_the_first_path() {
        let (mut param, store, runner) = timeout();
        store.create_key(DETAILS).unwrap();
        let additions = vec![
            SimpleParameter::new(DETAILS, "Retries", 3u32).unwrap(),
            SimpleParameter::new(r"Software\Elsewhere", "Mode", "fast").unwrap(),
            SimpleParameter::with_value("Level", 2u32).unwrap(),
        ];

        param.set_additions(&additions).unwrap();

        assert_eq!(store.value(DETAILS, "Mode"), Some(RegistryValue::from("fast")));
        assert_eq!(store.value(DETAILS, "Level"), Some(RegistryValue::Dword(2)));
        assert!(!store.contains_key(r"Software\Elsewhere"));
        assert_eq!(param.additions().len(), 3);
        assert!(param.additions().iter().all(|a| a.path() == Some(DETAILS)));
        assert_eq!(runner.count(), 1);
    }

    #[test]
    fn set_additions_on_missing_key_is_not_found() {
        let (mut param, store, runner) = timeout();
        assert!(param.set_additions(&details()).unwrap_err().is_not_found());
        assert!(!store.contains_key(DETAILS));
        assert_eq!(runner.count(), 0);
    }

    #[test]
    fn create_additions_skips_refresh() {
        let (mut param, store, runner) = timeout();
        param.create_additions(&details()).unwrap();
        assert_eq!(store.value(DETAILS, "Retries"), Some(RegistryValue::Dword(3)));
        assert_eq!(runner.count(), 0);
    }

    #[test]
    fn seeded_additions_are_kept_until_refresh() {
        let param = WindowsParameter::with_additions(
            SimpleParameter::new(APP, "Timeout", 30u32).unwrap(),
            details(),
            MemoryStore::new(),
            RecordingRunner::new(),
        )
        .unwrap();
        assert_eq!(param.additions(), details().as_slice());
    }

    #[test]
    fn seeded_additions_need_a_full_record() {
        let no_value = WindowsParameter::with_additions(
            SimpleParameter::with_path(APP, "Timeout").unwrap(),
            details(),
            MemoryStore::new(),
            RecordingRunner::new(),
        );
        assert!(no_value.unwrap_err().is_invalid_argument());

        let no_path = WindowsParameter::with_additions(
            SimpleParameter::with_value("Timeout", 30u32).unwrap(),
            details(),
            MemoryStore::new(),
            RecordingRunner::new(),
        );
        assert!(no_path.unwrap_err().is_invalid_argument());
    }

    #[test]
    fn set_additions_can_create_missing_key() {
        let (param, store, runner) = timeout();
        let config = ParameterConfig {
            missing_key: MissingKeyPolicy::Create,
            ..ParameterConfig::default()
        };
        let mut param = param.with_config(config);

        param.set_additions(&details()).unwrap();
        assert!(store.contains_key(DETAILS));
        assert_eq!(store.value(DETAILS, "Mode"), Some(RegistryValue::from("fast")));
        assert_eq!(param.additions().len(), 2);
        assert_eq!(runner.count(), 1);
    }

    #[test]
    fn set_additions_replaces_list_when_configured() {
        let (param, store, runner) = timeout();
        store.create_key(DETAILS).unwrap();
        let config = ParameterConfig {
            additions_refresh: AdditionsRefresh::Replace,
            ..ParameterConfig::default()
        };
        let mut param = param.with_config(config);

        param.set_additions(&details()).unwrap();
        param.set_additions(&details()).unwrap();
        assert_eq!(param.additions().len(), 2);
        assert_eq!(param.additions(), details().as_slice());
        assert_eq!(runner.count(), 2);
    }

    #[test]
    fn values_that_would_change_on_disk_are_refused() {
        let (mut param, store, runner) = timeout();
        store.create_key(APP).unwrap();

        assert!(param.set_value("a\0b").unwrap_err().is_invalid_argument());
        assert!(param
            .create_parameter(RegistryValue::MultiString(vec![String::new()]))
            .unwrap_err()
            .is_invalid_argument());
        assert_eq!(store.value(APP, "Timeout"), None);
        assert_eq!(runner.count(), 0);

        let additions = vec![
            SimpleParameter::new(DETAILS, "Retries", 3u32).unwrap(),
            SimpleParameter::new(DETAILS, "Mode", "fa\0st").unwrap(),
        ];
        assert!(param
            .create_additions(&additions)
            .unwrap_err()
            .is_invalid_argument());
        assert!(!store.contains_key(DETAILS));
    }

    #[test]
    fn key_names_with_slashes_are_kept_literal() {
        let html = r"MIME\Database\Content Type\text/html";
        let (mut param, store, _) =
            parameter(SimpleParameter::with_path(html, "Extension").unwrap());

        param.create_parameter(".htm").unwrap();
        assert_eq!(param.get_value().unwrap(), Some(RegistryValue::from(".htm")));
        assert!(store.contains_key(r"MIME\Database\Content Type"));
        assert!(!store.contains_key(r"MIME\Database\Content Type\text"));
    }
}
