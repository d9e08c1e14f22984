//! # Template Projector
//!
//! Writes one customer record plus the live shipment input into fixed cells of
//! a template workbook and saves the result as a new document. The template
//! file is only ever opened for reading.
//!
//! The target cells form a [`TemplateLayout`], which is configuration data so a
//! deployment shipping a different template only changes its config file.
use crate::error::PickupError;
use crate::lookup::is_blank_name;
use crate::lookup::CustomerRecord;
use crate::spreadsheet::patch::TemplatePatch;
use crate::spreadsheet::CellAddress;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;
use tracing::info;

/// Pattern of the date cell, e.g. `2024年05月01日`.
pub const DATE_FORMAT: &str = "%Y年%m月%d日";

/// Temperature class of a shipment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Temperature {
    Ambient,
    Chilled,
}

impl Temperature {
    pub const ALL: [Temperature; 2] = [Temperature::Ambient, Temperature::Chilled];

    /// Text written into the template.
    pub fn label(&self) -> &'static str {
        match self {
            Temperature::Ambient => "常温",
            Temperature::Chilled => "冷藏",
        }
    }
}

impl FromStr for Temperature {
    type Err = PickupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        match value {
            "常温" => Ok(Temperature::Ambient),
            "冷藏" => Ok(Temperature::Chilled),
            _ if value.eq_ignore_ascii_case("ambient") => Ok(Temperature::Ambient),
            _ if value.eq_ignore_ascii_case("chilled") => Ok(Temperature::Chilled),
            _ => Err(PickupError::InvalidArgument(format!(
                "temperature '{value}' is not one of 常温 (ambient), 冷藏 (chilled)"
            ))),
        }
    }
}

impl TryFrom<String> for Temperature {
    type Error = PickupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Temperature> for String {
    fn from(temperature: Temperature) -> Self {
        temperature.label().to_owned()
    }
}

impl Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Values entered at generation time. `count` is free text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShipmentInput {
    pub product: String,
    pub count: String,
    pub temperature: Temperature,
}

impl ShipmentInput {
    pub fn new(product: impl Into<String>, count: impl Into<String>, temperature: Temperature) -> Self {
        ShipmentInput {
            product: product.into(),
            count: count.into(),
            temperature,
        }
    }
}

/// Target sheet and cell addresses of the template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateLayout {
    pub sheet: String,
    pub date: CellAddress,
    pub name: CellAddress,
    pub phone: CellAddress,
    pub address: CellAddress,
    pub extra: CellAddress,
    pub product: CellAddress,
    pub count: CellAddress,
    pub temperature: CellAddress,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        TemplateLayout {
            sheet: "1".to_owned(),
            date: CellAddress::new(1, 2),
            name: CellAddress::new(2, 1),
            phone: CellAddress::new(2, 3),
            address: CellAddress::new(3, 1),
            extra: CellAddress::new(3, 3),
            product: CellAddress::new(5, 1),
            count: CellAddress::new(5, 2),
            temperature: CellAddress::new(5, 3),
        }
    }
}

impl TemplateLayout {
    /// Builds the cell edits for one document.
    pub fn patch(&self, record: &CustomerRecord, shipment: &ShipmentInput, date: NaiveDate) -> TemplatePatch {
        let mut patch = TemplatePatch::new(&self.sheet);
        patch
            .set(self.date, date.format(DATE_FORMAT).to_string())
            .set(self.name, record.name.as_str())
            .set(self.phone, record.phone.as_str())
            .set(self.address, record.address.as_str())
            .set(self.extra, record.extra.as_str())
            .set(self.product, shipment.product.as_str())
            .set(self.count, shipment.count.as_str())
            .set(self.temperature, shipment.temperature.label());
        patch
    }
}

/// A generated document handed to delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputDocument {
    pub path: PathBuf,
    pub customer: String,
    /// Size in bytes
    pub size: u64,
}

/// Renders the output workbook in memory.
///
/// Identical inputs always give identical bytes.
pub fn project(
    template: &Path,
    layout: &TemplateLayout,
    record: &CustomerRecord,
    shipment: &ShipmentInput,
    date: NaiveDate,
) -> Result<Vec<u8>, PickupError> {
    if is_blank_name(&record.name) {
        return Err(PickupError::InvalidArgument("customer name must not be empty".to_owned()));
    }

    debug!(template = %template.display(), sheet = %layout.sheet, "opening template");
    let file = File::open(template).map_err(|error| PickupError::template(template, error.into()))?;
    let patch = layout.patch(record, shipment, date);
    let output = patch
        .apply(BufReader::new(file), Cursor::new(Vec::new()))
        .map_err(|error| PickupError::template(template, error))?;
    Ok(output.into_inner())
}

/// Renders the output workbook and saves it at `output`, never over the template.
pub fn project_to_file(
    template: &Path,
    layout: &TemplateLayout,
    record: &CustomerRecord,
    shipment: &ShipmentInput,
    date: NaiveDate,
    output: &Path,
) -> Result<OutputDocument, PickupError> {
    if is_same_file(template, output) {
        return Err(PickupError::output(
            output,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "output path is the template itself"),
        ));
    }

    let bytes = project(template, layout, record, shipment, date)?;
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| PickupError::output(output, error))?;
    }
    fs::write(output, &bytes).map_err(|error| PickupError::output(output, error))?;

    info!(path = %output.display(), customer = %record.name, size = bytes.len(), "document written");
    Ok(OutputDocument {
        path: output.to_owned(),
        customer: record.name.to_owned(),
        size: bytes.len() as u64,
    })
}

fn is_same_file(left: &Path, right: &Path) -> bool {
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn temperature_labels_and_aliases() {
        assert_eq!("常温".parse::<Temperature>().unwrap(), Temperature::Ambient);
        assert_eq!(" 冷藏 ".parse::<Temperature>().unwrap(), Temperature::Chilled);
        assert_eq!("Ambient".parse::<Temperature>().unwrap(), Temperature::Ambient);
        assert_eq!("chilled".parse::<Temperature>().unwrap(), Temperature::Chilled);
        assert_eq!(Temperature::Chilled.to_string(), "冷藏");
        assert!(matches!("frozen".parse::<Temperature>(), Err(PickupError::InvalidArgument(_))));
    }

    #[test]
    fn default_layout_addresses() {
        let layout = TemplateLayout::default();
        let addresses = [
            layout.date, layout.name, layout.phone, layout.address,
            layout.extra, layout.product, layout.count, layout.temperature,
        ]
        .map(|address| address.to_string());
        assert_eq!(layout.sheet, "1");
        assert_eq!(addresses, ["C2", "B3", "D3", "B4", "D4", "B6", "C6", "D6"]);
    }

    #[test]
    fn layout_reads_partial_toml() {
        let layout: TemplateLayout = toml::from_str("sheet = \"提货单\"\ndate = \"E1\"").unwrap();
        assert_eq!(layout.sheet, "提货单");
        assert_eq!(layout.date, CellAddress::new(0, 4));
        assert_eq!(layout.name, TemplateLayout::default().name);
        assert!(toml::from_str::<TemplateLayout>("date = \"1C\"").is_err());
    }

    #[test]
    fn patch_holds_every_field() {
        let layout = TemplateLayout::default();
        let record = CustomerRecord::new("李四", "", "", "");
        let shipment = ShipmentInput::new("苹果", "10", Temperature::Ambient);
        let patch = layout.patch(&record, &shipment, date());

        assert_eq!(patch.sheet_name(), "1");
        assert_eq!(patch.len(), 8);
        assert_eq!(patch.get(layout.date), Some("2024年05月01日"));
        assert_eq!(patch.get(layout.name), Some("李四"));
        assert_eq!(patch.get(layout.phone), Some(""));
        assert_eq!(patch.get(layout.product), Some("苹果"));
        assert_eq!(patch.get(layout.count), Some("10"));
        assert_eq!(patch.get(layout.temperature), Some("常温"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let record = CustomerRecord::new(" ", "138", "", "");
        let shipment = ShipmentInput::new("苹果", "10", Temperature::Ambient);
        let error = project(Path::new("template.xlsx"), &TemplateLayout::default(), &record, &shipment, date());
        assert!(matches!(error, Err(PickupError::InvalidArgument(_))));
    }

    #[test]
    fn template_errors_are_classified() {
        let directory = tempfile::tempdir().unwrap();
        let record = CustomerRecord::new("李四", "", "", "");
        let shipment = ShipmentInput::new("苹果", "10", Temperature::Ambient);
        let layout = TemplateLayout::default();

        let missing = directory.path().join("missing.xlsx");
        assert!(matches!(
            project(&missing, &layout, &record, &shipment, date()),
            Err(PickupError::TemplateNotFound { .. })
        ));

        let corrupt = directory.path().join("corrupt.xlsx");
        fs::write(&corrupt, b"not a workbook").unwrap();
        assert!(matches!(
            project(&corrupt, &layout, &record, &shipment, date()),
            Err(PickupError::TemplateUnreadable { .. })
        ));
    }

    #[test]
    fn output_over_template_is_refused() {
        let directory = tempfile::tempdir().unwrap();
        let template = directory.path().join("template.xlsx");
        fs::write(&template, b"original").unwrap();
        let record = CustomerRecord::new("李四", "", "", "");
        let shipment = ShipmentInput::new("苹果", "10", Temperature::Ambient);

        let same = directory.path().join(".").join("template.xlsx");
        let error = project_to_file(&template, &TemplateLayout::default(), &record, &shipment, date(), &same);
        assert!(matches!(error, Err(PickupError::OutputWriteFailed { .. })));
        assert_eq!(fs::read(&template).unwrap(), b"original");
    }
}
