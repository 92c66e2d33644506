//! Print path: hand the preview markup to a print window.

use crate::{Error, ExportOutcome, Result};
use log::{error, info};
use std::path::PathBuf;

pub const PRINT_TITLE: &str = "Marriage Bio Data";

/// A window that accepts a document and can be asked to print it.
pub trait PrintWindow {
    fn write_document(&mut self, html: &str) -> Result<()>;
    fn print(&mut self) -> Result<()>;
}

/// Opens print windows. `None` means the platform refused (pop-up blocked).
pub trait PrintWindowOpener {
    fn open(&self) -> Option<Box<dyn PrintWindow>>;
}

/// Build the standalone A4 print document around `markup`.
///
/// When `stylesheet_origin` is set, the application stylesheet served from
/// that origin is linked so the cloned preview keeps its styling.
pub fn print_document(markup: &str, stylesheet_origin: Option<&str>) -> String {
    let stylesheet = stylesheet_origin
        .map(|origin| {
            format!(
                "\n    <link rel=\"stylesheet\" href=\"{}/_next/static/css/app/layout.css\" />",
                origin.trim_end_matches('/')
            )
        })
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>{title}</title>
    <style>
      @media print {{
        @page {{ size: A4; margin: 0; }}
        body {{
          margin: 0;
          padding: 0;
          -webkit-print-color-adjust: exact;
          print-color-adjust: exact;
        }}
      }}
      body {{ font-family: system-ui, -apple-system, sans-serif; margin: 0; padding: 0; }}
      * {{ box-sizing: border-box; }}
    </style>{stylesheet}
  </head>
  <body>
    {markup}
  </body>
</html>
"#,
        title = PRINT_TITLE,
        stylesheet = stylesheet,
        markup = markup
    )
}

fn run_print(opener: &dyn PrintWindowOpener, markup: &str, stylesheet_origin: Option<&str>) -> Result<()> {
    let mut window = opener.open().ok_or(Error::PopupBlocked)?;
    window.write_document(&print_document(markup, stylesheet_origin))?;
    window.print()
}

/// Open a print window for the preview markup.
pub fn prepare_print(opener: &dyn PrintWindowOpener, markup: &str, stylesheet_origin: Option<&str>) -> ExportOutcome {
    match run_print(opener, markup, stylesheet_origin) {
        Ok(()) => {
            info!("Print document prepared");
            ExportOutcome::ok()
        }
        Err(e) => {
            error!("Error preparing print: {}", e);
            ExportOutcome::failure(e.to_string())
        }
    }
}

/// Writes the print document to a file instead of a live window.
#[derive(Debug, Clone)]
pub struct HtmlFileOpener {
    path: PathBuf,
}

impl HtmlFileOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

struct HtmlFileWindow {
    path: PathBuf,
    html: Option<String>,
}

impl PrintWindow for HtmlFileWindow {
    fn write_document(&mut self, html: &str) -> Result<()> {
        self.html = Some(html.to_string());
        Ok(())
    }

    fn print(&mut self) -> Result<()> {
        let html = self.html.take().unwrap_or_default();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, html)?;
        info!("Print document written to {}", self.path.display());
        Ok(())
    }
}

impl PrintWindowOpener for HtmlFileOpener {
    fn open(&self) -> Option<Box<dyn PrintWindow>> {
        Some(Box::new(HtmlFileWindow { path: self.path.clone(), html: None }))
    }
}
