use rachis_protocol::{decode_archive, DECODE_CHUNK_CHARS};
use serde::Serialize;

use crate::cmd::DecodeArgs;
use crate::exit::{decode_error, io_error, CliResult, SUCCESS};
use crate::output::{display_opt, print_raw, print_report, OutputFormat, Report};

/// Zip local file header signature.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Serialize)]
struct DecodeOutput {
    file: String,
    encoded_chars: usize,
    chunks: usize,
    bytes: usize,
    zip_signature: bool,
    out: Option<String>,
}

impl Report for DecodeOutput {
    fn title(&self) -> &'static str {
        "Decoded Archive"
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("File", self.file.clone()),
            ("Encoded chars", self.encoded_chars.to_string()),
            ("Chunks", self.chunks.to_string()),
            ("Bytes", self.bytes.to_string()),
            ("Zip signature", self.zip_signature.to_string()),
            ("Written to", display_opt(self.out.as_deref())),
        ]
    }

    fn raw(&self) -> String {
        self.bytes.to_string()
    }
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let text =
        std::fs::read_to_string(&args.file).map_err(|err| io_error("read payload", err))?;
    let blob = decode_archive(&text).map_err(|err| decode_error("decode payload", err))?;

    let encoded_chars = text.chars().filter(|c| !c.is_ascii_whitespace()).count();
    tracing::debug!(
        file = %args.file.display(),
        encoded_chars,
        bytes = blob.len(),
        "decoded payload"
    );

    // Without --out, raw format streams the bytes themselves.
    if args.out.is_none() && matches!(format, OutputFormat::Raw) {
        print_raw(blob.as_bytes());
        return Ok(SUCCESS);
    }

    if let Some(out) = &args.out {
        std::fs::write(out, blob.as_bytes()).map_err(|err| io_error("write output", err))?;
    }

    let out = DecodeOutput {
        file: args.file.display().to_string(),
        encoded_chars,
        chunks: encoded_chars.div_ceil(DECODE_CHUNK_CHARS),
        bytes: blob.len(),
        zip_signature: blob.as_bytes().starts_with(ZIP_MAGIC),
        out: args.out.as_ref().map(|path| path.display().to_string()),
    };
    print_report(&out, format);
    Ok(SUCCESS)
}
