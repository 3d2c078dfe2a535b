use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Line-oriented prompt/answer I/O. Generic so tests can script a session.
pub struct Console<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Next line with surrounding whitespace trimmed, `None` at end of input.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub async fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        self.writer.write_all(label.as_bytes()).await?;
        self.writer.flush().await?;
        self.read_line().await
    }

    pub async fn say(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prompt_trims_and_reports_eof() {
        let mut console = Console::new(&b"  42 \r\nlast"[..], Vec::new());

        assert_eq!(console.prompt("id: ").await.unwrap().as_deref(), Some("42"));
        assert_eq!(console.read_line().await.unwrap().as_deref(), Some("last"));
        assert_eq!(console.read_line().await.unwrap(), None);
        assert_eq!(console.into_writer(), b"id: ".to_vec());
    }
}
