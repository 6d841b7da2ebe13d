pub(crate) mod reconcile;
mod run;
pub(crate) mod snapshot;
#[cfg(test)]
mod tests;

pub use run::run;
