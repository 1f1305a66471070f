use prefs_codec::{from_json, from_json_value, to_json_pretty, to_json_value};
use prefs_store::StoreValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{PrefError, PrefResult};
use crate::facade::PrefStore;
use crate::field::commit;

/// Current export envelope version.
pub const EXPORT_VERSION: u32 = 1;

/// Portable snapshot of a whole preference object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreferenceExport {
    pub version: u32,
    pub data: Value,
}

impl PreferenceExport {
    pub fn new(data: Value) -> Self {
        Self {
            version: EXPORT_VERSION,
            data,
        }
    }
}

impl<P> PrefStore<P>
where
    P: StoreValue + Serialize + DeserializeOwned,
{
    /// Snapshot the current object.
    pub async fn export_preferences(&self) -> PrefResult<PreferenceExport> {
        let object = self.data().get().await?;
        Ok(PreferenceExport::new(to_json_value(&object)?))
    }

    pub async fn export_json(&self) -> PrefResult<String> {
        Ok(to_json_pretty(&self.export_preferences().await?)?)
    }

    /// Replace the object with an exported snapshot in one commit.
    ///
    /// The snapshot is fully validated first; an invalid one leaves the
    /// store untouched.
    pub async fn import_preferences(&self, export: PreferenceExport) -> PrefResult<()> {
        if export.version != EXPORT_VERSION {
            return Err(PrefError::InvalidImport(format!(
                "unsupported export version {} (expected {EXPORT_VERSION})",
                export.version
            )));
        }
        let object: P = from_json_value(export.data)
            .map_err(|e| PrefError::InvalidImport(e.to_string()))?;

        commit(self.store().as_ref(), self.default_value(), "import", move |_| Ok(object)).await?;
        info!("preferences imported");
        Ok(())
    }

    pub async fn import_json(&self, text: &str) -> PrefResult<()> {
        let export: PreferenceExport =
            from_json(text).map_err(|e| PrefError::InvalidImport(e.to_string()))?;
        self.import_preferences(export).await
    }
}
