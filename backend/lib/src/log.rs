//! Logging setup for the wallet guard
//!
//! - JSON logging in Bunyan format or human-readable text logging
//! - [`LogFormat::Auto`] picks JSON when stdout is not a TTY
//! - Bunyan's `log.` field prefix is rewritten to `wallet_guard_log.`, the
//!   former collides with reserved fields of common log ingestion tools.
//!   Only keys are rewritten, values are left as they are.

use std::io::Write;

use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::{config::LogFormat, constants::server::SERVICE_NAME};

const BUNYAN_PREFIX: &str = "\"log.";
const REPLACEMENT_PREFIX: &str = "\"wallet_guard_log.";

/// Writer replacing [`BUNYAN_PREFIX`] on the keys of every record it is given
struct PrefixReplacingWriter<W: Write> {
    inner: W,
}

impl<W: Write> PrefixReplacingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for PrefixReplacingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match std::str::from_utf8(buf) {
            Ok(s) => {
                self.inner.write_all(replace_key_prefix(s).as_bytes())?;
                Ok(buf.len())
            }
            // not valid UTF-8, write as-is
            Err(_) => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Rewrite every `"log.<name>":` key, skipping string values that merely
/// start with `log.`
fn replace_key_prefix(record: &str) -> String {
    let mut out = String::with_capacity(record.len());
    let mut rest = record;

    while let Some(start) = rest.find(BUNYAN_PREFIX) {
        let (before, candidate) = rest.split_at(start);
        out.push_str(before);

        let name = &candidate[BUNYAN_PREFIX.len()..];
        let is_key = !before.ends_with('\\')
            && name.find('"').is_some_and(|end| {
                !name[..end].ends_with('\\') && name[end + 1..].starts_with(':')
            });

        if is_key {
            out.push_str(REPLACEMENT_PREFIX);
        } else {
            out.push_str(BUNYAN_PREFIX);
        }
        rest = name;
    }

    out.push_str(rest);
    out
}

struct PrefixReplacingMakeWriter;

impl<'a> MakeWriter<'a> for PrefixReplacingMakeWriter {
    type Writer = PrefixReplacingWriter<std::io::Stdout>;

    fn make_writer(&'a self) -> Self::Writer {
        PrefixReplacingWriter::new(std::io::stdout())
    }
}

/// Initialize the global subscriber with the given format
///
/// Filtering follows `RUST_LOG`.
pub fn initialize_logging(log_format: LogFormat) {
    let env_filter = EnvFilter::from_default_env();

    match log_format.resolve() {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(JsonStorageLayer)
                .with(BunyanFormattingLayer::new(
                    SERVICE_NAME.to_string(),
                    PrefixReplacingMakeWriter,
                ))
                .init();
        }
        // `resolve` never yields `Auto`
        LogFormat::Text | LogFormat::Auto => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
