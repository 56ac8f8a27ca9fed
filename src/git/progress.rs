use std::{io::Write, path::Path};

/// Object counters of a fetch, detached from libgit2 so they can be rendered anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub received_objects: usize,
    pub total_objects: usize,
    pub received_bytes: usize,
    pub indexed_deltas: usize,
    pub total_deltas: usize,
}

impl From<&git2::Progress<'_>> for TransferStats {
    fn from(progress: &git2::Progress<'_>) -> Self {
        TransferStats {
            received_objects: progress.received_objects(),
            total_objects: progress.total_objects(),
            received_bytes: progress.received_bytes(),
            indexed_deltas: progress.indexed_deltas(),
            total_deltas: progress.total_deltas(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Receiving,
    Resolving,
    Done,
}

/// Renders fetch progress the way `git clone` does, one line per phase,
/// rewriting the line in place until the phase completes.
pub struct TransferProgress<W: Write> {
    out: W,
    phase: Phase,
    last_percent: Option<usize>,
}

impl<W: Write> TransferProgress<W> {
    pub fn new(out: W) -> Self {
        TransferProgress {
            out,
            phase: Phase::Receiving,
            last_percent: None,
        }
    }

    pub fn update(&mut self, stats: TransferStats) {
        if stats.total_objects == 0 || self.phase == Phase::Done {
            return;
        }

        if self.phase == Phase::Receiving {
            let percent = percent(stats.received_objects, stats.total_objects);
            if self.last_percent != Some(percent) {
                self.last_percent = Some(percent);
                let _ = write!(
                    self.out,
                    "\rReceiving objects: {:>3}% ({}/{}), {}",
                    percent,
                    stats.received_objects,
                    stats.total_objects,
                    format_bytes(stats.received_bytes)
                );
            }
            if stats.received_objects < stats.total_objects {
                let _ = self.out.flush();
                return;
            }
            let _ = writeln!(self.out, ", done.");
            self.phase = Phase::Resolving;
            self.last_percent = None;
        }

        if stats.total_deltas == 0 {
            let _ = self.out.flush();
            return;
        }

        let percent = percent(stats.indexed_deltas, stats.total_deltas);
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            let _ = write!(
                self.out,
                "\rResolving deltas: {:>3}% ({}/{})",
                percent, stats.indexed_deltas, stats.total_deltas
            );
        }
        if stats.indexed_deltas >= stats.total_deltas {
            let _ = writeln!(self.out, ", done.");
            self.phase = Phase::Done;
        }
        let _ = self.out.flush();
    }
}

pub struct CheckoutProgress<W: Write> {
    out: W,
    last_percent: Option<usize>,
}

impl<W: Write> CheckoutProgress<W> {
    pub fn new(out: W) -> Self {
        CheckoutProgress {
            out,
            last_percent: None,
        }
    }

    pub fn update(&mut self, _path: Option<&Path>, completed: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = percent(completed, total);
        if self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);
        let _ = write!(
            self.out,
            "\rUpdating files: {:>3}% ({}/{})",
            percent, completed, total
        );
        if completed >= total {
            let _ = writeln!(self.out, ", done.");
        }
        let _ = self.out.flush();
    }
}

/// Forwards the remote's own progress messages (`remote: Counting objects...`),
/// prefixing every line even when a line arrives split across several chunks.
pub struct SidebandProgress<W: Write> {
    out: W,
    at_line_start: bool,
}

impl<W: Write> SidebandProgress<W> {
    pub fn new(out: W) -> Self {
        SidebandProgress {
            out,
            at_line_start: true,
        }
    }

    pub fn forward(&mut self, data: &[u8]) -> bool {
        for line in data.split_inclusive(|byte| *byte == b'\n' || *byte == b'\r') {
            if self.at_line_start {
                let _ = self.out.write_all(b"remote: ");
            }
            let _ = self.out.write_all(line);
            self.at_line_start = matches!(line.last(), Some(b'\n' | b'\r'));
        }
        let _ = self.out.flush();
        true
    }
}

fn percent(done: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        done.min(total) * 100 / total
    }
}

fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= GIB {
        format!("{:.2} GiB", bytes / GIB)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes / MIB)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}
