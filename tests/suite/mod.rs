#[cfg(unix)]
mod headless;
#[cfg(unix)]
mod workflow;
