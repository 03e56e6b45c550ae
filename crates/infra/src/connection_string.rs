//! Storage connection strings.
//!
//! A connection string is a `;`-separated list of `Key=Value` settings. Keys
//! are case-insensitive; values may contain `=` (account keys are base64).
//! Parse errors never echo setting values, which are usually secrets.

use std::collections::HashMap;

use storekeeper_common::SecretValue;
use thiserror::Error;
use url::Url;

/// Account name of the local storage emulator.
pub const DEVELOPMENT_ACCOUNT_NAME: &str = "devstoreaccount1";

/// Published account key of the local storage emulator.
pub const DEVELOPMENT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

const DEVELOPMENT_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
const DEVELOPMENT_TABLE_ENDPOINT: &str = "http://127.0.0.1:10002/devstoreaccount1";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Services a connection string can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageService {
    Blob,
    Table,
    Cosmos,
}

impl StorageService {
    /// Subdomain label for account-name endpoints.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Table => "table",
            Self::Cosmos => "documents",
        }
    }

    const fn endpoint_setting(self) -> &'static str {
        match self {
            Self::Blob => "BlobEndpoint",
            Self::Table => "TableEndpoint",
            Self::Cosmos => "AccountEndpoint",
        }
    }

    const fn development_endpoint(self) -> Option<&'static str> {
        match self {
            Self::Blob => Some(DEVELOPMENT_BLOB_ENDPOINT),
            Self::Table => Some(DEVELOPMENT_TABLE_ENDPOINT),
            Self::Cosmos => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionStringError {
    #[error("connection string is empty")]
    Empty,

    #[error("connection string setting {index} is not of the form Key=Value")]
    MalformedSetting { index: usize },

    #[error("connection string does not describe a {service} endpoint")]
    MissingEndpoint { service: &'static str },

    #[error("connection string {setting} is not a valid URL: {reason}")]
    InvalidEndpoint { setting: &'static str, reason: String },

    #[error("connection string carries no account key or shared access signature")]
    MissingCredential,
}

/// Credentials carried inside a connection string.
#[derive(Debug, Clone)]
pub enum ConnectionStringCredential {
    AccountKey { account_name: String, account_key: SecretValue },
    SharedAccessSignature(SecretValue),
}

/// A parsed connection string.
#[derive(Clone)]
pub struct ConnectionString {
    settings: HashMap<String, SecretValue>,
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.settings.keys().collect();
        keys.sort();
        f.debug_struct("ConnectionString").field("keys", &keys).finish()
    }
}

impl ConnectionString {
    /// Parse `Key=Value;Key=Value` settings. Empty segments are skipped.
    ///
    /// # Errors
    /// Returns `ConnectionStringError::Empty` when no setting is present and
    /// `ConnectionStringError::MalformedSetting` for a segment without `=`
    /// or with a blank key.
    pub fn parse(raw: &str) -> Result<Self, ConnectionStringError> {
        let mut settings = HashMap::new();
        for (index, segment) in raw.split(';').map(str::trim).filter(|s| !s.is_empty()).enumerate()
        {
            let (key, value) =
                segment.split_once('=').ok_or(ConnectionStringError::MalformedSetting { index })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConnectionStringError::MalformedSetting { index });
            }
            settings.insert(key.to_ascii_lowercase(), SecretValue::new(value.trim()));
        }
        if settings.is_empty() {
            return Err(ConnectionStringError::Empty);
        }
        Ok(Self { settings })
    }

    /// Value of `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings
            .get(&key.to_ascii_lowercase())
            .map(SecretValue::expose)
            .filter(|v| !v.is_empty())
    }

    /// True for `UseDevelopmentStorage=true`.
    pub fn uses_development_storage(&self) -> bool {
        self.get("UseDevelopmentStorage").is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn account_name(&self) -> Option<&str> {
        self.get("AccountName")
    }

    /// Endpoint for `service`.
    ///
    /// Precedence: an explicit endpoint setting, then protocol, account name
    /// and suffix, then the development storage emulator.
    ///
    /// # Errors
    /// Returns `ConnectionStringError::MissingEndpoint` when none applies and
    /// `ConnectionStringError::InvalidEndpoint` for an unparsable URL.
    pub fn endpoint(&self, service: StorageService) -> Result<Url, ConnectionStringError> {
        let setting = service.endpoint_setting();
        if let Some(explicit) = self.get(setting) {
            return parse_endpoint(setting, explicit);
        }

        if service != StorageService::Cosmos {
            if let Some(account) = self.account_name() {
                let protocol = self.get("DefaultEndpointsProtocol").unwrap_or("https");
                let suffix = self.get("EndpointSuffix").unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
                let derived = format!("{protocol}://{account}.{}.{suffix}/", service.label());
                return parse_endpoint(setting, &derived);
            }
        }

        match service.development_endpoint() {
            Some(endpoint) if self.uses_development_storage() => parse_endpoint(setting, endpoint),
            _ => Err(ConnectionStringError::MissingEndpoint { service: service.label() }),
        }
    }

    /// Credential for a handle on `endpoint`.
    ///
    /// The emulator's published key is used for development storage. An
    /// account key without `AccountName` takes the account from the first
    /// label of the endpoint host, as Cosmos connection strings do.
    ///
    /// # Errors
    /// Returns `ConnectionStringError::MissingCredential` when the string has
    /// no key and no shared access signature.
    pub fn credential(
        &self,
        endpoint: &Url,
    ) -> Result<ConnectionStringCredential, ConnectionStringError> {
        if let Some(account_key) = self.get("AccountKey") {
            let account_name = self
                .account_name()
                .map(str::to_string)
                .or_else(|| account_from_endpoint(endpoint))
                .ok_or(ConnectionStringError::MissingCredential)?;
            return Ok(ConnectionStringCredential::AccountKey {
                account_name,
                account_key: SecretValue::new(account_key),
            });
        }
        if let Some(signature) = self.get("SharedAccessSignature") {
            return Ok(ConnectionStringCredential::SharedAccessSignature(SecretValue::new(
                signature.trim_start_matches('?'),
            )));
        }
        if self.uses_development_storage() {
            return Ok(ConnectionStringCredential::AccountKey {
                account_name: DEVELOPMENT_ACCOUNT_NAME.to_string(),
                account_key: SecretValue::new(DEVELOPMENT_ACCOUNT_KEY),
            });
        }
        Err(ConnectionStringError::MissingCredential)
    }
}

/// First label of the endpoint host, e.g. `acct1` for
/// `https://acct1.documents.azure.com/`.
pub fn account_from_endpoint(endpoint: &Url) -> Option<String> {
    endpoint
        .host_str()
        .and_then(|host| host.split('.').next())
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

/// Parse an endpoint and make sure it ends with `/` so resource names can
/// be joined onto it.
pub(crate) fn parse_endpoint(
    setting: &'static str,
    raw: &str,
) -> Result<Url, ConnectionStringError> {
    let mut url = Url::parse(raw).map_err(|e| ConnectionStringError::InvalidEndpoint {
        setting,
        reason: e.to_string(),
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
