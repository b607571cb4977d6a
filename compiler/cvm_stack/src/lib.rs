//! Stack growth for recursive type evaluation and code emission.
//!
//! Expression typing and emission recurse once per tree level, and calls
//! re-evaluate argument types during overload resolution. Deeply nested
//! expressions (long operator chains from generated code) can exceed the
//! default thread stack, so recursive entry points wrap their bodies in
//! [`ensure_sufficient_stack`].
//!
//! - **Native targets**: `stacker` grows the stack on demand.
//! - **WASM targets**: plain call.

/// If less than this remains, grow the stack.
#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 64 * 1024;

/// Size of each newly allocated stack segment.
#[cfg(not(target_arch = "wasm32"))]
const GROW_BY: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, GROW_BY, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Nesting depth of a left-leaning `((1 + 1) + 1) + ...` chain.
    fn nested_depth(n: u32) -> u32 {
        ensure_sufficient_stack(|| if n == 0 { 0 } else { nested_depth(n - 1) + 1 })
    }

    #[test]
    fn test_deep_recursion() {
        assert_eq!(nested_depth(200_000), 200_000);
    }

    #[test]
    fn test_returns_closure_result() {
        let result: Result<u8, &str> = ensure_sufficient_stack(|| Ok(7));
        assert_eq!(result, Ok(7));
    }
}
