use crate::job::predicate::StorePredicate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const ADDRESS: &str = "address";
pub const REQUEST_DATE: &str = "requestDate";
pub const RESUME_AFTER: &str = "resumeAfter";

/// Keys every store backup launch has to provide.
pub const REQUIRED_KEYS: &[&str] = &[ADDRESS];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("Missing required job parameter '{0}'")]
    Missing(String),

    #[error("Job parameter '{0}' must not be blank")]
    Blank(String),

    #[error("Job parameter '{key}' has an invalid value '{value}'")]
    Invalid { key: String, value: String },
}

/// Immutable execution context of one job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JobParameters {
    values: BTreeMap<String, String>,
}

impl JobParameters {
    pub fn builder() -> JobParametersBuilder {
        JobParametersBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks that every required key is present and non-blank. Keys not
    /// listed are ignored.
    pub fn validate(&self, required: &[&str]) -> Result<(), ParameterError> {
        for key in required {
            match self.values.get(*key) {
                None => return Err(ParameterError::Missing(key.to_string())),
                Some(v) if v.trim().is_empty() => {
                    return Err(ParameterError::Blank(key.to_string()));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Read predicate derived from the `address` parameter.
    pub fn predicate(&self) -> Result<StorePredicate, ParameterError> {
        self.validate(&[ADDRESS])?;
        let address = self.get(ADDRESS).unwrap_or_default();
        Ok(StorePredicate::address_prefix(address))
    }

    pub fn request_date(&self) -> Option<&str> {
        self.get(REQUEST_DATE)
    }

    /// Store id the read should start after, if a resume point was given.
    pub fn resume_after(&self) -> Result<Option<i64>, ParameterError> {
        match self.get(RESUME_AFTER) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ParameterError::Invalid {
                    key: RESUME_AFTER.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    /// Identifies "the same job" across launches: every parameter except the
    /// request date and the resume point, hashed in key order.
    pub fn fingerprint(&self, job_name: &str) -> String {
        let mut h = blake3::Hasher::new();
        h.update(job_name.as_bytes());
        for (k, v) in self.iter() {
            if k == REQUEST_DATE || k == RESUME_AFTER {
                continue;
            }
            h.update(b"\x1f");
            h.update(k.as_bytes());
            h.update(b"=");
            h.update(v.as_bytes());
        }
        format!("job-{}", &h.finalize().to_hex()[..16])
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobParametersBuilder {
    values: BTreeMap<String, String>,
}

impl JobParametersBuilder {
    pub fn add_string(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn add_optional(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.add_string(key, v),
            None => self,
        }
    }

    /// Finishes the parameters, stamping `requestDate` with the current time
    /// when it was not supplied.
    pub fn to_job_parameters(mut self) -> JobParameters {
        self.values
            .entry(REQUEST_DATE.to_string())
            .or_insert_with(|| chrono::Utc::now().to_rfc3339());
        JobParameters {
            values: self.values,
        }
    }
}
