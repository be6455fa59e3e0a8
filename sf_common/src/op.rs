/// Implements an arithmetic operator for a single-field newtype by delegating to the wrapped value.
///
/// * `binary` and `inplace` combine two values of the newtype.
/// * `scalar` combines the newtype with a bare value of the inner type, e.g. a unit price times a quantity.
/// * `unary` applies to the newtype alone.
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

    (scalar $for_struct:ident, $rhs:ty, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait<$rhs> for $for_struct {
            type Output = Self;

            fn $impl_fn(self, rhs: $rhs) -> Self::Output {
                Self(self.0.$impl_fn(rhs))
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
}
