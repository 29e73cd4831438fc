#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`Parameters`](crate::Parameters) vector from named slots.
///
/// ```
/// use pali_morph::{Category, params};
///
/// let p = params![PartOfSpeech => 1, Case => 3];
/// assert_eq!(p.get(Category::Case), 3);
/// assert_eq!(p.get(Category::Gender), 0);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Parameters::EMPTY
    };
    ( $($category:ident => $value:expr),+ $(,)? ) => {{
        let mut p = $crate::Parameters::EMPTY;
        $( p.set($crate::Category::$category, $value); )+
        p
    }};
}
