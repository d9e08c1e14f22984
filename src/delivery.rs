//! Handing a finished document to the user.
//!
//! Strategies are tried in rank order until one succeeds. A failed delivery is
//! logged and reported back, but the document itself is already written, so it
//! never turns into a [`crate::PickupError`].
use std::io::Stdout;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("File '{}' does not exist", .0.display())]
    MissingFile(PathBuf),

    #[error("{0}")]
    IoError(#[from] std::io::Error),
}

/// One way of presenting a file to the user.
pub trait DeliveryStrategy {
    fn name(&self) -> &str;

    fn deliver(&mut self, path: &Path) -> Result<(), DeliveryError>;
}

/// Opens the document with the desktop's default application.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenWithSystem;

impl DeliveryStrategy for OpenWithSystem {
    fn name(&self) -> &str {
        "open-with-system"
    }

    fn deliver(&mut self, path: &Path) -> Result<(), DeliveryError> {
        ensure_exists(path)?;
        open::that(path)?;
        Ok(())
    }
}

/// Opens the folder that contains the document.
#[derive(Clone, Copy, Debug, Default)]
pub struct RevealFolder;

impl DeliveryStrategy for RevealFolder {
    fn name(&self) -> &str {
        "reveal-folder"
    }

    fn deliver(&mut self, path: &Path) -> Result<(), DeliveryError> {
        ensure_exists(path)?;
        let folder = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        open::that(folder)?;
        Ok(())
    }
}

/// Prints the document path, the last resort.
#[derive(Debug)]
pub struct ShowPath<W: Write = Stdout> {
    writer: W,
}

impl ShowPath<Stdout> {
    pub fn stdout() -> Self {
        ShowPath { writer: std::io::stdout() }
    }
}

impl<W: Write> ShowPath<W> {
    pub fn new(writer: W) -> Self {
        ShowPath { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DeliveryStrategy for ShowPath<W> {
    fn name(&self) -> &str {
        "show-path"
    }

    fn deliver(&mut self, path: &Path) -> Result<(), DeliveryError> {
        writeln!(self.writer, "{}", path.display())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// A strategy that did not work, with its reason.
#[derive(Debug)]
pub struct DeliveryFailure {
    pub strategy: String,
    pub error: DeliveryError,
}

/// Result of running the strategy chain.
#[derive(Debug, Default)]
pub struct Delivery {
    /// Name of the strategy that succeeded, `None` when all failed
    pub strategy: Option<String>,
    pub failures: Vec<DeliveryFailure>,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        self.strategy.is_some()
    }
}

/// The stock chain: open the file, then its folder, then print the path.
/// With `open_files` off only the path is printed.
pub fn default_strategies(open_files: bool) -> Vec<Box<dyn DeliveryStrategy>> {
    let mut strategies: Vec<Box<dyn DeliveryStrategy>> = Vec::new();
    if open_files {
        strategies.push(Box::new(OpenWithSystem));
        strategies.push(Box::new(RevealFolder));
    }
    strategies.push(Box::new(ShowPath::stdout()));
    strategies
}

/// Tries each strategy in order and stops at the first success.
pub fn deliver_first(strategies: &mut [Box<dyn DeliveryStrategy>], path: &Path) -> Delivery {
    let mut delivery = Delivery::default();
    for strategy in strategies.iter_mut() {
        debug!(strategy = strategy.name(), path = %path.display(), "delivering");
        match strategy.deliver(path) {
            Ok(()) => {
                info!(strategy = strategy.name(), path = %path.display(), "document delivered");
                delivery.strategy = Some(strategy.name().to_owned());
                break;
            }
            Err(error) => {
                warn!(strategy = strategy.name(), %error, "delivery strategy failed");
                delivery.failures.push(DeliveryFailure {
                    strategy: strategy.name().to_owned(),
                    error,
                });
            }
        }
    }
    delivery
}

fn ensure_exists(path: &Path) -> Result<(), DeliveryError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DeliveryError::MissingFile(path.to_owned()))
    }
}
