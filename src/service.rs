//! One user action per call: search, generate, deliver.
use crate::config::Config;
use crate::delivery::deliver_first;
use crate::delivery::Delivery;
use crate::delivery::DeliveryStrategy;
use crate::error::PickupError;
use crate::lookup::find_matches_in_file;
use crate::lookup::CustomerRecord;
use crate::lookup::LookupOutcome;
use crate::naming::unique_output_path;
use crate::template::project_to_file;
use crate::template::OutputDocument;
use crate::template::ShipmentInput;
use chrono::NaiveDateTime;

/// Runs lookups and generations against the files named by a [`Config`].
///
/// No state is carried between calls; every call opens and releases its files.
#[derive(Debug, Clone)]
pub struct PickupService {
    config: Config,
}

impl PickupService {
    pub fn new(config: Config) -> Self {
        PickupService { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Searches the configured data source.
    pub fn search(&self, keyword: &str) -> Result<LookupOutcome, PickupError> {
        let results = find_matches_in_file(
            &self.config.data_source_path(),
            &self.config.lookup.sheet,
            self.config.lookup.key_column.0,
            keyword,
        )?;
        Ok(LookupOutcome::from(results))
    }

    /// Fills the configured template and writes it under the output directory.
    /// `now` dates the document and names the file.
    pub fn generate(
        &self,
        record: &CustomerRecord,
        shipment: &ShipmentInput,
        now: NaiveDateTime,
    ) -> Result<OutputDocument, PickupError> {
        let output = unique_output_path(&self.config.output_dir, &record.name, now);
        project_to_file(
            &self.config.template_path(),
            &self.config.layout,
            record,
            shipment,
            now.date(),
            &output,
        )
    }

    /// Hands a generated document to the first strategy that works.
    pub fn deliver(&self, document: &OutputDocument, strategies: &mut [Box<dyn DeliveryStrategy>]) -> Delivery {
        deliver_first(strategies, &document.path)
    }
}
