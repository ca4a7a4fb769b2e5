//! Frame inspection
//!
//! Reads NDJSON frames and reports the family and type of each one.

use anyhow::Result;
use canvas_protocol::{decode, FrameReader};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

/// Frames seen by [`inspect`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectSummary {
    pub frames: usize,
    pub invalid: usize,
}

/// Write `<family> <type>` for every frame, `invalid <reason>` for frames
/// that do not decode
///
/// # Errors
/// Read or write failure; undecodable frames are counted, not errors
pub async fn inspect<R, W>(input: R, mut out: W) -> Result<InspectSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = FrameReader::new(input);
    let mut summary = InspectSummary::default();

    while let Some(frame) = reader.next_frame().await? {
        summary.frames += 1;
        let line = match decode(&frame) {
            Ok(event) => format!("{} {}\n", event.family().as_str(), event.event_type()),
            Err(e) => {
                summary.invalid += 1;
                tracing::debug!(frame = %frame, error = %e, "undecodable frame");
                format!("invalid {e}\n")
            }
        };
        out.write_all(line.as_bytes()).await?;
    }
    out.flush().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_family_and_type() {
        let input = concat!(
            r#"{"type":"run_started","thread_id":"t","run_id":"r"}"#,
            "\n\n",
            r#"{"type":"delete_surface","surfaceId":"s"}"#,
            "\n",
            r#"{"type":"brand_new","x":1}"#,
            "\n",
            "not json\n",
        );
        let mut out = Vec::new();
        let summary = inspect(input.as_bytes(), &mut out).await.unwrap();

        assert_eq!(summary, InspectSummary { frames: 4, invalid: 1 });
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "lifecycle run_started");
        assert_eq!(lines[1], "surface delete_surface");
        assert_eq!(lines[2], "unknown brand_new");
        assert!(lines[3].starts_with("invalid "));
    }
}
