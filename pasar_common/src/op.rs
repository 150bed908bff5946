//! Implements standard operator traits for newtypes wrapping a single numeric field.

/// Implements an operator trait for a tuple newtype by delegating to the inner type.
///
/// `binary` covers `Add`/`Sub` style traits, `inplace` covers the `*Assign` variants, `unary` covers `Neg`, and
/// `scalar` implements e.g. `Mul<i64>` where the right-hand side is a bare scalar rather than the newtype.
#[macro_export]
macro_rules! op {
    (binary $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            type Output = Self;
            fn $impl_fn(self, rhs: Self) -> Self::Output {
                Self(self.0.$impl_fn(rhs.0))
            }
        }
    };

    (inplace $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            fn $impl_fn(&mut self, rhs: Self) {
                self.0.$impl_fn(rhs.0)
            }
        }
    };

    (unary $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            type Output = Self;
            fn $impl_fn(self) -> Self::Output {
                Self(self.0.$impl_fn())
            }
        }
    };

    (scalar $for_struct:ident, $scalar:ty, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait<$scalar> for $for_struct {
            type Output = Self;
            fn $impl_fn(self, rhs: $scalar) -> Self::Output {
                Self(self.0.$impl_fn(rhs))
            }
        }
    };
}
