//! # Letterform CLI
//!
//! Usage:
//!   letterform render letter.json --pretty > pages.json
//!   cat letter.json | letterform render --debug
//!   letterform paginate 121.27 272 300
//!   letterform example > letter.json

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use letterform::content::PublicBucketResolver;
use letterform::error::LetterformError;
use letterform::{PaginationRequest, RenderOptions};

#[derive(Parser)]
#[command(name = "letterform", version, about = "DIN 5008 letter layout and pagination")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lay out a letter document and print the page tree as JSON.
    Render {
        /// Document JSON; stdin when omitted.
        input: Option<PathBuf>,
        /// Overlay zone guides on every page.
        #[arg(long)]
        debug: bool,
        /// Indent the output.
        #[arg(long)]
        pretty: bool,
        /// Base URL of the public storage that holds template images.
        #[arg(long, requires = "bucket")]
        storage_base_url: Option<String>,
        /// Storage bucket of template images.
        #[arg(long, requires = "storage_base_url")]
        bucket: Option<String>,
    },
    /// Split a measured body height into pages.
    Paginate {
        /// Top of the body on page one, in mm.
        editor_top_mm: f64,
        /// Top of the footer, in mm.
        footer_top_mm: f64,
        /// Measured body height, in mm.
        content_height_mm: f64,
    },
    /// Print a sample letter document.
    Example,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LETTERFORM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_input(input: Option<&PathBuf>) -> Result<String, LetterformError> {
    match input {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn write_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), LetterformError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}

fn run(cli: Cli) -> Result<(), LetterformError> {
    match cli.command {
        Command::Render {
            input,
            debug,
            pretty,
            storage_base_url,
            bucket,
        } => {
            let json = read_input(input.as_ref())?;
            let document = letterform::parse_document(&json)?;
            let resolver = storage_base_url
                .zip(bucket)
                .map(|(base, bucket)| PublicBucketResolver::new(&base, &bucket));

            let mut options = RenderOptions {
                debug,
                ..RenderOptions::default()
            };
            if let Some(resolver) = &resolver {
                options.resolver = resolver;
            }

            let rendered = letterform::render_document(&document, &options);
            tracing::info!(pages = rendered.pagination.total_pages, "rendered");
            write_json(&rendered, pretty)
        }
        Command::Paginate {
            editor_top_mm,
            footer_top_mm,
            content_height_mm,
        } => {
            for (name, value) in [
                ("editor top", editor_top_mm),
                ("footer top", footer_top_mm),
                ("content height", content_height_mm),
            ] {
                if !value.is_finite() {
                    return Err(LetterformError::InvalidInput(format!("{name} must be a finite number")));
                }
            }
            let pagination = letterform::paginate(&PaginationRequest {
                editor_top_mm,
                footer_top_mm,
                content_height_mm,
            });
            write_json(&pagination, true)
        }
        Command::Example => {
            print!("{}", example_letter_json());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {e}");
            ExitCode::FAILURE
        }
    }
}

fn example_letter_json() -> &'static str {
    r##"{
  "letter": {
    "subject": "Antrag auf Akteneinsicht",
    "letter_date": "2024-05-02",
    "reference_number": "32-1701/24",
    "closing_formula": "Mit freundlichen Grüßen",
    "closing_name": "Dr. Schmidt",
    "closing_title": "Amtsleiterin",
    "content_html": "<p>Sehr geehrter Herr Klein,</p><p>wir bestätigen den Eingang Ihres Antrags vom 12.04.2024 auf Einsicht in die Akte {{aktenzeichen}}.</p><p>Die Unterlagen liegen ab dem 15.05.2024 zur Einsicht bereit. Bitte vereinbaren Sie vorab einen Termin:</p><ul><li>telefonisch unter {{telefon}}</li><li>per E-Mail an {{email}}</li></ul>",
    "attachments": [
      { "file_name": "merkblatt_akteneinsicht.pdf", "display_name": "Merkblatt Akteneinsicht" }
    ]
  },
  "template": {
    "layout_settings": {
      "blockContent": {
        "infoBlock": {
          "mode": "lines",
          "lines": [
            { "type": "label-value", "label": "Ihr Zeichen", "value": "{{ihr_zeichen}}" },
            { "type": "label-value", "label": "Unser Zeichen", "value": "{{aktenzeichen}}" },
            { "type": "spacer", "spacerHeight": 3 },
            { "type": "label-value", "label": "Ansprechpartner", "value": "{{ansprechpartner}}" },
            { "type": "label-value", "label": "Telefon", "value": "{{telefon}}" },
            { "type": "spacer", "spacerHeight": 3 },
            { "type": "label-value", "label": "Datum", "value": "{{datum}}", "labelBold": true }
          ]
        }
      }
    },
    "header_layout_type": "structured",
    "header_text_elements": [
      { "type": "text", "x": 25, "y": 15, "content": "{{absender_organisation}}", "fontSize": 16, "fontWeight": "bold" },
      { "type": "text", "x": 25, "y": 23, "content": "{{absender_strasse}} · {{absender_plz}} {{absender_ort}}", "fontSize": 9, "color": "#555555" }
    ],
    "footer_blocks": [
      { "title": "Anschrift", "width": 35, "widthUnit": "percent", "lines": [
        { "type": "text-only", "value": "{{absender_strasse}}" },
        { "type": "text-only", "value": "{{absender_plz}} {{absender_ort}}" }
      ] },
      { "title": "Kontakt", "lines": [
        { "type": "label-value", "label": "Tel.", "value": "{{absender_telefon}}" },
        { "type": "label-value", "label": "Web", "value": "{{absender_website}}" }
      ] },
      { "title": "Bankverbindung", "width": 5.5, "widthUnit": "cm", "lines": [
        { "type": "text-only", "value": "Sparkasse Musterstadt" },
        { "type": "label-value", "label": "IBAN", "value": "DE12 3456 7890 1234 5678 90" }
      ] }
    ]
  },
  "sender": {
    "organization": "Stadt Musterstadt · Bürgeramt",
    "street": "Rathausplatz 1",
    "postal_code": "12345",
    "city": "Musterstadt",
    "phone": "01234 567-0",
    "website": "www.musterstadt.de"
  },
  "recipient": {
    "name": "Herbert Klein",
    "gender": "male",
    "street": "Hauptstraße 1",
    "postal_code": "12345",
    "city": "Musterstadt"
  },
  "informationBlock": {
    "contact_person": "Frau Weber",
    "phone": "01234 567-89",
    "email": "buergeramt@musterstadt.de",
    "your_reference": "Schreiben vom 12.04.2024"
  }
}
"##
}
