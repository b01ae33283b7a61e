use std::io::{self, Write};

use serde_json::Value;

use crate::domain::TableFormat;
use crate::error::SliceError;
use crate::slice::ExpressionSlice;

#[derive(Debug, Clone)]
pub struct TableOutput {
    pub content_type: &'static str,
    pub body: String,
}

pub fn emit_table(slice: &ExpressionSlice, format: TableFormat) -> TableOutput {
    let body = match format {
        TableFormat::Json => table_json(slice),
        TableFormat::Tsv => table_tsv(slice),
    };
    TableOutput {
        content_type: format.content_type(),
        body,
    }
}

/// Column-major: keyed by accession, each mapping gene symbol to value.
pub fn table_json(slice: &ExpressionSlice) -> String {
    let mut columns = serde_json::Map::new();
    for (j, accession) in slice.accessions.iter().enumerate() {
        let mut column = serde_json::Map::new();
        for (i, gene) in slice.genes.iter().enumerate() {
            let value = serde_json::Number::from_f64(slice.values[i][j])
                .map(Value::Number)
                .unwrap_or(Value::Null);
            column.insert(gene.clone(), value);
        }
        columns.insert(accession.clone(), Value::Object(column));
    }
    Value::Object(columns).to_string()
}

pub fn table_tsv(slice: &ExpressionSlice) -> String {
    let mut out = String::new();
    for accession in &slice.accessions {
        out.push('\t');
        out.push_str(accession);
    }
    out.push('\n');
    for (gene, row) in slice.genes.iter().zip(&slice.values) {
        out.push_str(gene);
        for value in row {
            out.push('\t');
            // Full precision; only the streamed transpose rounds.
            out.push_str(&value.to_string());
        }
        out.push('\n');
    }
    out
}

/// Each line is flushed before the next sample is fetched, so partial output
/// is observable and a slow sink suspends the producer.
pub fn stream_transpose<'a, W, I>(
    mut sink: W,
    genes: &[String],
    samples: I,
) -> Result<(), SliceError>
where
    W: Write,
    I: Iterator<Item = Result<(&'a str, Vec<f64>), SliceError>>,
{
    let mut header = String::from("sample");
    for gene in genes {
        header.push('\t');
        header.push_str(gene);
    }
    header.push('\n');
    sink.write_all(header.as_bytes()).map_err(stream_error)?;
    sink.flush().map_err(stream_error)?;

    for sample in samples {
        let (accession, values) = sample?;
        let mut line = String::from(accession);
        for value in &values {
            line.push('\t');
            line.push_str(&format_sig(*value));
        }
        line.push('\n');
        sink.write_all(line.as_bytes()).map_err(stream_error)?;
        sink.flush().map_err(stream_error)?;
    }
    Ok(())
}

fn stream_error(err: io::Error) -> SliceError {
    SliceError::StreamWrite(err.to_string())
}

/// printf `%g`: fixed or scientific, 6 significant digits.
pub fn format_sig(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sci = format!("{value:.5e}");
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exponent.parse().unwrap_or(0);

    if exp < -4 || exp >= 6 {
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        format!("{mantissa}e{}{:02}", if exp < 0 { '-' } else { '+' }, exp.abs())
    } else {
        let decimals = (5 - exp).max(0) as usize;
        let fixed = format!("{value:.decimals$}");
        if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            fixed
        }
    }
}
