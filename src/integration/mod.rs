//! Integration tests driving whole runs against fake external tools

#[cfg(unix)]
mod e2e;
#[cfg(unix)]
mod fixtures;
