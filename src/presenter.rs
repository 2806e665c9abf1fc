//! Rendering the merged line stream for a terminal.

use std::io::{self, Write};
use std::path::PathBuf;

use futures_util::stream::{Stream as FuturesStream, StreamExt};

use crate::mux::Event;

/// Writes events one at a time, announcing each change of source file.
///
/// Output for an event is, in order: a `==> path <==` banner when the path
/// differs from the previous event's, an `Error tailing` notice when the
/// event carries an error, then the line text.
#[derive(Debug)]
pub struct Presenter<W> {
    out: W,
    last_source: Option<PathBuf>,
}

impl<W: Write> Presenter<W> {
    pub fn new(out: W) -> Self {
        Presenter {
            out,
            last_source: None,
        }
    }

    pub fn present(&mut self, event: &Event) -> io::Result<()> {
        let source = event.source();

        if self.last_source.as_deref() != Some(source) {
            writeln!(self.out, "==> {} <==", source.display())?;
            self.last_source = Some(source.to_path_buf());
        }

        if let Some(err) = event.err() {
            tracing::warn!(path = %source.display(), error = %err, "error tailing file");
            writeln!(self.out, "Error tailing {}: {}", source.display(), err)?;
            if event.text().is_empty() {
                return self.out.flush();
            }
        }

        writeln!(self.out, "{}", event.text())?;
        self.out.flush()
    }

    /// Presents every event of `lines` until it ends.
    pub async fn drain<S>(&mut self, mut lines: S) -> io::Result<()>
    where
        S: FuturesStream<Item = Event> + Unpin,
    {
        while let Some(event) = lines.next().await {
            self.present(&event)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::reader::Line;
    use futures_util::stream;

    fn render(events: Vec<Event>) -> String {
        let mut presenter = Presenter::new(Vec::new());
        for event in &events {
            presenter.present(event).unwrap();
        }
        String::from_utf8(presenter.into_inner()).unwrap()
    }

    #[test]
    fn test_banner_on_path_change() {
        let out = render(vec![
            Event::new("a.log", Line::new("a1")),
            Event::new("a.log", Line::new("a2")),
            Event::new("b.log", Line::new("b1")),
            Event::new("a.log", Line::new("a3")),
        ]);
        assert_eq!(
            out,
            "==> a.log <==\na1\na2\n==> b.log <==\nb1\n==> a.log <==\na3\n"
        );
    }

    #[test]
    fn test_error_notice() {
        let out = render(vec![
            Event::new("a.log", Line::new("a1")),
            Event::new("a.log", Line::error(Error::Removed(PathBuf::from("a.log")))),
        ]);
        assert_eq!(
            out,
            "==> a.log <==\na1\nError tailing a.log: File removed: a.log\n"
        );
    }

    #[test]
    fn test_empty_lines_are_kept() {
        let out = render(vec![
            Event::new("a.log", Line::new("")),
            Event::new("a.log", Line::new("x")),
        ]);
        assert_eq!(out, "==> a.log <==\n\nx\n");
    }

    #[tokio::test]
    async fn test_drain_stream() {
        let events = stream::iter(vec![
            Event::new("a.log", Line::new("1")),
            Event::new("b.log", Line::new("2")),
        ]);
        let mut presenter = Presenter::new(Vec::new());
        presenter.drain(events).await.unwrap();
        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(out, "==> a.log <==\n1\n==> b.log <==\n2\n");
    }
}
