//! Positional-argument unpacking: turns a `List` of call/invocation
//! arguments into a handler's typed parameter list, grounded on cppwamp's
//! `Unmarshall<TArgs...>::apply` (`args.hpp`), see `SPEC_FULL.md` §4.1.2.

use crate::error::UnpackError;
use crate::value::{FromValue, List};

/// A zero-arity handler simply ignores the positional list.
pub fn unpack0<F, R>(_args: &List, f: F) -> Result<R, UnpackError>
where
    F: FnOnce() -> R,
{
    Ok(f())
}

macro_rules! unpack_fn {
    ($name:ident, $count:expr, $($t:ident @ $idx:expr),+) => {
        #[allow(non_snake_case)]
        pub fn $name<$($t: FromValue,)+ F, R>(args: &List, f: F) -> Result<R, UnpackError>
        where
            F: FnOnce($($t),+) -> R,
        {
            if args.len() < $count {
                return Err(UnpackError::Arity {
                    expected: $count,
                    got: args.len(),
                });
            }
            $(
                let $t = $t::from_value(&args[$idx])
                    .map_err(|e| e.push(format!("positional argument {}", $idx)))?;
            )+
            Ok(f($($t),+))
        }
    };
}

unpack_fn!(unpack1, 1, T1 @ 0);
unpack_fn!(unpack2, 2, T1 @ 0, T2 @ 1);
unpack_fn!(unpack3, 3, T1 @ 0, T2 @ 1, T3 @ 2);
unpack_fn!(unpack4, 4, T1 @ 0, T2 @ 1, T3 @ 2, T4 @ 3);
unpack_fn!(unpack5, 5, T1 @ 0, T2 @ 1, T3 @ 2, T4 @ 3, T5 @ 4);

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value;

    #[test]
    fn unpack0_ignores_the_argument_list() {
        let args: List = vec![Value::Int(1)];
        let result = unpack0(&args, || 42).unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn unpack2_converts_and_applies() {
        let args: List = vec![Value::String("ada".to_string()), Value::Int(36)];
        let result: Result<String, UnpackError> =
            unpack2(&args, |name: String, age: i64| format!("{} is {}", name, age));
        assert_eq!(result.unwrap(), "ada is 36");
    }

    #[test]
    fn insufficient_arity_is_reported() {
        let args: List = vec![Value::Int(1)];
        let result = unpack2(&args, |_a: i64, _b: i64| ());
        assert!(matches!(
            result,
            Err(UnpackError::Arity {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn conversion_failure_is_reported_with_the_offending_index() {
        let args: List = vec![Value::Int(1), Value::String("nope".to_string())];
        let result: Result<i64, UnpackError> = unpack2(&args, |a: i64, _b: i64| a);
        assert!(matches!(result, Err(UnpackError::Conversion(_))));
    }
}
