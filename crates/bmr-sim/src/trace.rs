use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bmr_core::errors::ErrorInfo;
use bmr_core::{RestoreError, State};

use crate::config::OutputConfig;

/// One recorded output event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRecord<'a> {
    /// Simulated time of the output event.
    pub time: f64,
    /// State of the process at that time.
    pub state: &'a State,
    /// Tour the process was in.
    pub tour: usize,
}

/// Output events recorded during a run, stored as three parallel sequences.
///
/// Append-only: times are strictly increasing, tour indices non-decreasing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    times: Vec<f64>,
    states: Vec<State>,
    tours: Vec<usize>,
}

impl Trace {
    /// Empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a trace from parallel sequences, checking their invariants.
    pub fn from_parts(
        times: Vec<f64>,
        states: Vec<State>,
        tours: Vec<usize>,
    ) -> Result<Self, RestoreError> {
        if times.len() != states.len() || times.len() != tours.len() {
            return Err(RestoreError::Serde(
                ErrorInfo::new("trace-length-mismatch", "trace sequences differ in length")
                    .with_context("times", times.len().to_string())
                    .with_context("states", states.len().to_string())
                    .with_context("tours", tours.len().to_string()),
            ));
        }
        if let Some(index) = times.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(RestoreError::Serde(
                ErrorInfo::new("trace-time-order", "output times must be strictly increasing")
                    .with_context("index", (index + 1).to_string()),
            ));
        }
        if let Some(index) = tours.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(RestoreError::Serde(
                ErrorInfo::new("trace-tour-order", "tour indices must be non-decreasing")
                    .with_context("index", (index + 1).to_string()),
            ));
        }
        if let Some(first) = states.first() {
            let dimension = first.len();
            if let Some(index) = states.iter().position(|state| state.len() != dimension) {
                return Err(RestoreError::Serde(
                    ErrorInfo::new("trace-ragged-states", "output states differ in dimension")
                        .with_context("index", index.to_string())
                        .with_context("expected", dimension.to_string()),
                ));
            }
        }
        Ok(Self {
            times,
            states,
            tours,
        })
    }

    pub(crate) fn push(&mut self, time: f64, state: &State, tour: usize) {
        self.times.push(time);
        self.states.push(state.clone());
        self.tours.push(tour);
    }

    /// Number of recorded outputs.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Returns `true` when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Output times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Output states.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Tour index active at each output.
    pub fn tours(&self) -> &[usize] {
        &self.tours
    }

    /// Iterates over the records in order.
    pub fn records(&self) -> impl Iterator<Item = TraceRecord<'_>> + '_ {
        self.times
            .iter()
            .zip(self.states.iter())
            .zip(self.tours.iter())
            .map(|((&time, state), &tour)| TraceRecord { time, state, tour })
    }

    /// Writes one time per line.
    pub fn write_times<W: Write>(&self, mut out: W) -> io::Result<()> {
        for time in &self.times {
            writeln!(out, "{time}")?;
        }
        out.flush()
    }

    /// Writes one state per line, every coordinate followed by a space.
    pub fn write_states<W: Write>(&self, mut out: W) -> io::Result<()> {
        for state in &self.states {
            for value in state.iter() {
                write!(out, "{value} ")?;
            }
            writeln!(out)?;
        }
        out.flush()
    }

    /// Writes one tour index per line.
    pub fn write_tours<W: Write>(&self, mut out: W) -> io::Result<()> {
        for tour in &self.tours {
            writeln!(out, "{tour}")?;
        }
        out.flush()
    }

    /// Reads the three text files written by [`Trace::export`].
    pub fn read_from_files(
        times: &Path,
        states: &Path,
        tours: &Path,
    ) -> Result<Self, RestoreError> {
        let times = read_times(open_for_read(times)?)?;
        let states = read_states(open_for_read(states)?)?;
        let tours = read_tours(open_for_read(tours)?)?;
        Self::from_parts(times, states, tours)
    }

    /// Writes the times, states and tours files into the configured run
    /// directory.
    ///
    /// Unless `overwrite` is set, nothing is written when any destination
    /// already exists (`destination-exists`). Files created by a failed
    /// export are removed again.
    pub fn export(&self, layout: &OutputConfig) -> Result<ExportedFiles, RestoreError> {
        let files = ExportedFiles::in_layout(layout)?;
        if !layout.overwrite {
            ensure_absent(&files.paths())?;
        }
        let run_dir = run_directory(layout)?;
        fs::create_dir_all(run_dir).map_err(|err| {
            RestoreError::Output(
                ErrorInfo::new("run-dir-mkdir", err.to_string())
                    .with_context("path", run_dir.display().to_string()),
            )
        })?;

        let jobs: [(&Path, &dyn Fn(&mut BufWriter<File>) -> io::Result<()>); 3] = [
            (files.times.as_path(), &|out: &mut BufWriter<File>| self.write_times(out)),
            (files.states.as_path(), &|out: &mut BufWriter<File>| self.write_states(out)),
            (files.tours.as_path(), &|out: &mut BufWriter<File>| self.write_tours(out)),
        ];
        let mut written = Vec::with_capacity(jobs.len());
        for (path, job) in jobs {
            if let Err(err) = write_file(path, layout.overwrite, job) {
                remove_files(&written);
                return Err(err);
            }
            written.push(path);
        }
        Ok(files)
    }
}

/// Paths of the text files produced by [`Trace::export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    /// Output times file.
    pub times: PathBuf,
    /// Output states file.
    pub states: PathBuf,
    /// Tour index file.
    pub tours: PathBuf,
}

impl ExportedFiles {
    fn in_layout(layout: &OutputConfig) -> Result<Self, RestoreError> {
        let run_dir = run_directory(layout)?;
        Ok(Self {
            times: run_dir.join(&layout.times_file),
            states: run_dir.join(&layout.states_file),
            tours: run_dir.join(&layout.tours_file),
        })
    }

    pub(crate) fn paths(&self) -> [&Path; 3] {
        [self.times.as_path(), self.states.as_path(), self.tours.as_path()]
    }
}

pub(crate) fn run_directory(layout: &OutputConfig) -> Result<&Path, RestoreError> {
    layout.run_directory.as_deref().ok_or_else(|| {
        RestoreError::Output(
            ErrorInfo::new("no-run-directory", "output layout has no run directory")
                .with_hint("set output.run_directory"),
        )
    })
}

fn destination_exists(path: &Path, message: String) -> RestoreError {
    RestoreError::Output(
        ErrorInfo::new("destination-exists", message)
            .with_context("path", path.display().to_string())
            .with_hint("remove the file or set output.overwrite"),
    )
}

/// Fails on the first path that already exists.
pub(crate) fn ensure_absent(paths: &[&Path]) -> Result<(), RestoreError> {
    match paths.iter().find(|path| path.exists()) {
        Some(path) => Err(destination_exists(path, "destination already exists".into())),
        None => Ok(()),
    }
}

/// Best-effort cleanup of files created by a failed export.
pub(crate) fn remove_files(paths: &[&Path]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %err, "Could not remove partial export");
        }
    }
}

pub(crate) fn create_destination(path: &Path, overwrite: bool) -> Result<File, RestoreError> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options.open(path).map_err(|err| {
        if err.kind() == io::ErrorKind::AlreadyExists {
            destination_exists(path, err.to_string())
        } else {
            RestoreError::Output(
                ErrorInfo::new("destination-open", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        }
    })
}

fn write_file(
    path: &Path,
    overwrite: bool,
    write: &dyn Fn(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<(), RestoreError> {
    let file = create_destination(path, overwrite)?;
    let mut out = BufWriter::new(file);
    write(&mut out).map_err(|err| {
        remove_files(&[path]);
        RestoreError::Output(
            ErrorInfo::new("trace-write", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}

fn open_for_read(path: &Path) -> Result<BufReader<File>, RestoreError> {
    File::open(path).map(BufReader::new).map_err(|err| {
        RestoreError::Serde(
            ErrorInfo::new("trace-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}

fn parse_error(line: usize, token: &str, err: impl ToString) -> RestoreError {
    RestoreError::Serde(
        ErrorInfo::new("trace-parse", err.to_string())
            .with_context("line", line.to_string())
            .with_context("token", token.to_string()),
    )
}

fn read_error(err: io::Error) -> RestoreError {
    RestoreError::Serde(ErrorInfo::new("trace-read", err.to_string()))
}

/// Parses a times file.
pub fn read_times<R: BufRead>(input: R) -> Result<Vec<f64>, RestoreError> {
    let mut times = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(read_error)?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        times.push(token.parse::<f64>().map_err(|err| parse_error(index + 1, token, err))?);
    }
    Ok(times)
}

/// Parses a states file; coordinates are whitespace separated.
pub fn read_states<R: BufRead>(input: R) -> Result<Vec<State>, RestoreError> {
    let mut states = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(read_error)?;
        if line.trim().is_empty() {
            continue;
        }
        let coords = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|err| parse_error(index + 1, token, err))
            })
            .collect::<Result<Vec<_>, _>>()?;
        states.push(State::from_vec(coords));
    }
    Ok(states)
}

/// Parses a tours file.
pub fn read_tours<R: BufRead>(input: R) -> Result<Vec<usize>, RestoreError> {
    let mut tours = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(read_error)?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        tours.push(token.parse::<usize>().map_err(|err| parse_error(index + 1, token, err))?);
    }
    Ok(tours)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trace() -> Trace {
        let mut trace = Trace::new();
        trace.push(0.25, &State::from_vec(vec![1.0, -0.5]), 0);
        trace.push(0.5, &State::from_vec(vec![2.0, 3.25]), 0);
        trace.push(1.75, &State::from_vec(vec![-1.0, 0.0]), 2);
        trace
    }

    #[test]
    fn text_layout_matches_downstream_format() {
        let trace = sample_trace();
        let mut times = Vec::new();
        let mut states = Vec::new();
        let mut tours = Vec::new();
        trace.write_times(&mut times).unwrap();
        trace.write_states(&mut states).unwrap();
        trace.write_tours(&mut tours).unwrap();

        assert_eq!(String::from_utf8(times).unwrap(), "0.25\n0.5\n1.75\n");
        assert_eq!(String::from_utf8(states).unwrap(), "1 -0.5 \n2 3.25 \n-1 0 \n");
        assert_eq!(String::from_utf8(tours).unwrap(), "0\n0\n2\n");
    }

    #[test]
    fn readers_accept_written_text() {
        let trace = sample_trace();
        let mut states = Vec::new();
        trace.write_states(&mut states).unwrap();
        let parsed = read_states(states.as_slice()).unwrap();
        assert_eq!(parsed, trace.states());
    }

    #[test]
    fn from_parts_rejects_broken_invariants() {
        let state = State::zeros(1);
        let err = Trace::from_parts(vec![1.0, 1.0], vec![state.clone(), state.clone()], vec![0, 0])
            .unwrap_err();
        assert_eq!(err.code(), "trace-time-order");

        let err = Trace::from_parts(vec![1.0, 2.0], vec![state.clone(), state.clone()], vec![1, 0])
            .unwrap_err();
        assert_eq!(err.code(), "trace-tour-order");

        let err = Trace::from_parts(vec![1.0], vec![], vec![0]).unwrap_err();
        assert_eq!(err.code(), "trace-length-mismatch");
    }

    #[test]
    fn bad_token_reports_line() {
        let err = read_times("0.5\nabc\n".as_bytes()).unwrap_err();
        assert_eq!(err.code(), "trace-parse");
        assert_eq!(err.info().context["line"], "2");
    }
}
