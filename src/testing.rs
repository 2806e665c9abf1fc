//! In-memory `FileWatch` used by unit tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use futures_util::stream;

use crate::error::Error;
use crate::reader::{FileWatch, Line, TailConfig};

/// One scripted record: `Ok(text)` or `Err(message)`.
pub(crate) type Record = Result<&'static str, &'static str>;

/// Replays fixed records per path and remembers every `open` call.
#[derive(Debug, Default)]
pub(crate) struct ScriptedWatch {
    scripts: Mutex<HashMap<PathBuf, Vec<Record>>>,
    failing: Mutex<HashSet<PathBuf>>,
    opened: Mutex<Vec<(PathBuf, TailConfig)>>,
}

impl ScriptedWatch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, path: impl Into<PathBuf>, records: Vec<Record>) {
        self.scripts.lock().unwrap().insert(path.into(), records);
    }

    pub(crate) fn fail(&self, path: impl Into<PathBuf>) {
        self.failing.lock().unwrap().insert(path.into());
    }

    pub(crate) fn opened(&self) -> Vec<(PathBuf, TailConfig)> {
        self.opened.lock().unwrap().clone()
    }
}

impl FileWatch for ScriptedWatch {
    type Lines = stream::Iter<std::vec::IntoIter<Line>>;

    fn open(
        &self,
        path: &Path,
        config: &TailConfig,
    ) -> impl Future<Output = Result<Self::Lines, Error>> + Send {
        self.opened
            .lock()
            .unwrap()
            .push((path.to_path_buf(), config.clone()));

        let res = if self.failing.lock().unwrap().contains(path) {
            Err(Error::Open {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted failure"),
            })
        } else {
            let records = self
                .scripts
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .unwrap_or_default();
            let lines: Vec<Line> = records
                .into_iter()
                .map(|record| match record {
                    Ok(text) => Line::new(text),
                    Err(msg) => Line::error(Error::Read {
                        path: path.to_path_buf(),
                        source: io::Error::new(io::ErrorKind::Other, msg),
                    }),
                })
                .collect();
            Ok(stream::iter(lines))
        };

        async move { res }
    }
}
