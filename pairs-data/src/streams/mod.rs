/// [`TimeoutStream`](timeout::TimeoutStream) ending a stream after an idle period.
pub mod timeout;
