//! Macros for ergonomic event kind declarations.

/// Declare `EventKind` constants.
///
/// Kinds are dotted paths; declaring the family root alongside its
/// subkinds keeps grouped transitions readable.
///
/// # Example
///
/// ```
/// use statree::event_kinds;
///
/// event_kinds! {
///     pub MEDIA = "Media";
///     pub MEDIA_PLAY = "Media.Play";
///     pub MEDIA_STOP = "Media.Stop";
/// }
///
/// assert!(MEDIA_PLAY.is_subkind_of(&MEDIA));
/// ```
#[macro_export]
macro_rules! event_kinds {
    (
        $(
            $(#[$meta:meta])*
            $vis:vis $name:ident = $value:literal
        );* $(;)?
    ) => {
        $(
            $(#[$meta])*
            $vis const $name: $crate::core::EventKind =
                $crate::core::EventKind::from_static($value);
        )*
    };
}
