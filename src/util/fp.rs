/// Pipes a value through a function, so a response can be built at the end
/// of a method chain instead of being wrapped around it.
///
/// ```rust
/// use scribe::util::fp::Pipe;
/// let wrapped: Option<i32> = 5.pipe(Some);
/// assert_eq!(wrapped, Some(5));
/// ```
pub trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R;
}

impl<T> Pipe for T {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}
