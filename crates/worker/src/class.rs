/// Execution classes used for tracing spawned engine work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Timer callbacks that directly affect what the user sees (active-month election).
	Interactive,
	/// Data fetches whose completion order does not matter.
	Fetch,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Fetch => "fetch",
		}
	}
}
