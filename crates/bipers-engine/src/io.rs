// crates/bipers-engine/src/io.rs

//! The persisted computation format.
//!
//! A file starts with one ASCII tag line. The current tag is followed by
//! three length-prefixed msgpack values: the input parameters, the
//! template-points message, and the arrangement message. The predecessor
//! tag marks a legacy binary stream that is recognised but not readable.
//! JSON helpers cover the template-points message alone, for interchange.

use crate::computation::ComputationResult;
use crate::messages::{ArrangementMessage, TemplatePointsMessage};
use bipers_core::{Error, InputParameters, Result};
use bipers_vineyard::UpdaterStats;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufRead, Read, Write};

/// Current on-disk tag.
pub const TAG_MSGPACK: &str = "RIVET_msgpack";
/// Legacy tag, kept so old files fail with a clear diagnostic.
pub const TAG_LEGACY: &str = "RIVET_1";

fn write_block<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    let bytes = rmp_serde::to_vec(value).map_err(|e| Error::Format(e.to_string()))?;
    writer
        .write_all(&(bytes.len() as u64).to_le_bytes())
        .map_err(|e| Error::Format(e.to_string()))?;
    writer
        .write_all(&bytes)
        .map_err(|e| Error::Format(e.to_string()))?;
    Ok(())
}

fn read_block<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    let mut len_bytes = [0u8; 8];
    reader
        .read_exact(&mut len_bytes)
        .map_err(|e| Error::Format(format!("truncated block header: {e}")))?;
    let len = u64::from_le_bytes(len_bytes);
    let mut bytes = vec![0u8; len as usize];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| Error::Format(format!("truncated block body: {e}")))?;
    rmp_serde::from_slice(&bytes).map_err(|e| Error::Format(e.to_string()))
}

/// Persist a computation.
///
/// # Errors
/// [`Error::Format`] on serialisation or write failure.
pub fn write_computation<W: Write>(
    writer: &mut W,
    params: &InputParameters,
    template_points: &TemplatePointsMessage,
    arrangement: &ArrangementMessage,
) -> Result<()> {
    writeln!(writer, "{TAG_MSGPACK}").map_err(|e| Error::Format(e.to_string()))?;
    write_block(writer, params)?;
    write_block(writer, template_points)?;
    write_block(writer, arrangement)?;
    Ok(())
}

/// Read back a persisted computation.
///
/// # Errors
/// [`Error::Format`] for an unknown tag, the legacy tag, or a truncated or
/// corrupt body.
pub fn read_computation<R: BufRead>(
    reader: &mut R,
) -> Result<(InputParameters, TemplatePointsMessage, ArrangementMessage)> {
    let mut tag = String::new();
    reader
        .read_line(&mut tag)
        .map_err(|e| Error::Format(e.to_string()))?;
    match tag.trim_end() {
        TAG_MSGPACK => {
            let params = read_block(reader)?;
            let template_points = read_block(reader)?;
            let arrangement = read_block(reader)?;
            Ok((params, template_points, arrangement))
        }
        TAG_LEGACY => Err(Error::Format(format!(
            "{TAG_LEGACY} streams use a legacy binary archive and cannot be read"
        ))),
        other => Err(Error::Format(format!(
            "not a persisted computation (tag {other:?})"
        ))),
    }
}

/// Split a result into its wire messages.
#[must_use]
pub fn result_to_messages(
    result: &ComputationResult,
) -> (TemplatePointsMessage, ArrangementMessage) {
    (
        TemplatePointsMessage {
            x_label: result.x_label.clone(),
            y_label: result.y_label.clone(),
            template_points: result.template_points.clone(),
            homology_dimensions: result.homology_dimensions.clone(),
            xs_exact: result.xs_exact.clone(),
            ys_exact: result.ys_exact.clone(),
            x_reverse: result.x_reverse,
            y_reverse: result.y_reverse,
        },
        ArrangementMessage::from_arrangement(&result.arrangement),
    )
}

/// Reassemble a result from its wire messages (statistics reset to zero).
///
/// # Errors
/// [`Error::Format`] if the arrangement message is self-inconsistent.
pub fn result_from_messages(
    template_points: TemplatePointsMessage,
    arrangement: &ArrangementMessage,
) -> Result<ComputationResult> {
    Ok(ComputationResult {
        arrangement: arrangement.to_arrangement()?,
        template_points: template_points.template_points,
        homology_dimensions: template_points.homology_dimensions,
        xs_exact: template_points.xs_exact,
        ys_exact: template_points.ys_exact,
        x_label: template_points.x_label,
        y_label: template_points.y_label,
        x_reverse: template_points.x_reverse,
        y_reverse: template_points.y_reverse,
        stats: UpdaterStats::default(),
    })
}

/// Write the template-points message as pretty JSON.
///
/// # Errors
/// [`Error::Format`] on serialisation or write failure.
pub fn write_template_points_json<W: Write>(
    writer: W,
    message: &TemplatePointsMessage,
) -> Result<()> {
    serde_json::to_writer_pretty(writer, message).map_err(|e| Error::Format(e.to_string()))
}

/// Read a template-points message from JSON.
///
/// # Errors
/// [`Error::Format`] on malformed JSON.
pub fn read_template_points_json<R: Read>(reader: R) -> Result<TemplatePointsMessage> {
    serde_json::from_reader(reader).map_err(|e| Error::Format(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bipers_arrangement::build_arrangement;
    use bipers_core::{exact_int, UnsignedMatrix};
    use std::io::Cursor;

    fn sample_messages() -> (InputParameters, TemplatePointsMessage, ArrangementMessage) {
        let xs = vec![exact_int(0), exact_int(1)];
        let ys = vec![exact_int(0), exact_int(1)];
        let arrangement = build_arrangement(xs.clone(), ys.clone(), &[(1, 1)]).unwrap();
        let params = InputParameters::default();
        let template_points = TemplatePointsMessage {
            x_label: "scale".into(),
            y_label: "density".into(),
            template_points: vec![],
            homology_dimensions: UnsignedMatrix::new(2, 2),
            xs_exact: xs,
            ys_exact: ys,
            x_reverse: false,
            y_reverse: true,
        };
        let arrangement_message = ArrangementMessage::from_arrangement(&arrangement);
        (params, template_points, arrangement_message)
    }

    #[test]
    fn tagged_stream_round_trip() {
        let (params, tpm, am) = sample_messages();
        let mut buffer = Vec::new();
        write_computation(&mut buffer, &params, &tpm, &am).unwrap();
        assert!(buffer.starts_with(TAG_MSGPACK.as_bytes()));

        let mut cursor = Cursor::new(buffer);
        let (params2, tpm2, am2) = read_computation(&mut cursor).unwrap();
        assert_eq!(params, params2);
        assert_eq!(tpm, tpm2);
        assert_eq!(am, am2);
    }

    #[test]
    fn legacy_tag_is_recognised_but_rejected() {
        let mut cursor = Cursor::new(b"RIVET_1\nsome legacy bytes".to_vec());
        let err = read_computation(&mut cursor).unwrap_err();
        assert!(err.to_string().contains("RIVET_1"));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut cursor = Cursor::new(b"NOT_A_TAG\n".to_vec());
        assert!(matches!(
            read_computation(&mut cursor),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn truncated_stream_is_a_format_error() {
        let (params, tpm, am) = sample_messages();
        let mut buffer = Vec::new();
        write_computation(&mut buffer, &params, &tpm, &am).unwrap();
        buffer.truncate(buffer.len() / 2);
        let mut cursor = Cursor::new(buffer);
        assert!(matches!(
            read_computation(&mut cursor),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn template_points_json_round_trip() {
        let (_, tpm, _) = sample_messages();
        let mut buffer = Vec::new();
        write_template_points_json(&mut buffer, &tpm).unwrap();
        let back = read_template_points_json(Cursor::new(buffer)).unwrap();
        assert_eq!(tpm, back);
    }
}
