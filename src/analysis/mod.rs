/// Query layer over a loaded dataset.
///
/// Everything here is a pure function of the in-memory tables and a
/// `FilterSelection`; nothing is cached between calls.
///
/// Submodules:
/// - `filter`    : selection value object, row filtering, selection lists.
/// - `aggregate` : summary metrics, group-by sums, maximum flags.
/// - `growth`    : per-month series and month-over-month change.

pub mod aggregate;
pub mod filter;
pub mod growth;
