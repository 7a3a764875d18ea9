//! The closed set of `isEnabled(...)` call forms the codemod understands.

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CallShape {
    /// `FeatureFlags.isEnabled('id', { screenName: 'S' })`
    NamespacedWithOptions,
    /// `FeatureFlags.isEnabled('id')`
    NamespacedPlain,
    /// `isEnabled('id', { screenName: 'S' })`
    LocalWithOptions,
    /// `isEnabled('id')`
    LocalPlain,
}

const IDENT: &str = r"[A-Za-z_$][\w$]*";
const PLAIN_REST: &str = r"\s*\)";
/// Single-level object literal as the second argument.
const OPTIONS_REST: &str = r"\s*,\s*\{[^{}]*\}\s*\)";

impl CallShape {
    /// Every shape, in the order they are applied to a file.
    pub const ALL: [CallShape; 4] = [
        CallShape::NamespacedWithOptions,
        CallShape::NamespacedPlain,
        CallShape::LocalWithOptions,
        CallShape::LocalPlain,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CallShape::NamespacedWithOptions => "namespaced-with-options",
            CallShape::NamespacedPlain => "namespaced-plain",
            CallShape::LocalWithOptions => "local-with-options",
            CallShape::LocalPlain => "local-plain",
        }
    }

    pub fn is_namespaced(&self) -> bool {
        matches!(
            self,
            CallShape::NamespacedWithOptions | CallShape::NamespacedPlain
        )
    }

    pub fn has_options(&self) -> bool {
        matches!(
            self,
            CallShape::NamespacedWithOptions | CallShape::LocalWithOptions
        )
    }

    /// Pattern matching this shape for `flag_id`.
    ///
    /// Groups: `call` is the whole call expression; `callee`, `open`, `arg`
    /// and `rest` partition it. Local shapes also capture the single `lead`
    /// character before the call so that member calls are not mistaken for
    /// local ones.
    pub fn regex(&self, flag_id: &str) -> Result<Regex, regex::Error> {
        let id = regex::escape(flag_id);
        let arg = format!(r#"(?P<arg>'{id}'|"{id}")"#);
        let rest = if self.has_options() {
            OPTIONS_REST
        } else {
            PLAIN_REST
        };
        let pattern = if self.is_namespaced() {
            format!(
                r"(?P<call>(?P<callee>{IDENT}(?:\s*\.\s*{IDENT})*\s*\.\s*isEnabled)(?P<open>\s*\(\s*){arg}(?P<rest>{rest}))"
            )
        } else {
            format!(
                r"(?m)(?P<lead>^|[^\w$.])(?P<call>(?P<callee>isEnabled)(?P<open>\s*\(\s*){arg}(?P<rest>{rest}))"
            )
        };
        Regex::new(&pattern)
    }

    /// A representative call of this shape.
    pub fn example(&self, flag_id: &str) -> String {
        match self {
            CallShape::NamespacedWithOptions => {
                format!("FeatureFlags.isEnabled('{flag_id}', {{ screenName: 'Home' }})")
            }
            CallShape::NamespacedPlain => format!("FeatureFlags.isEnabled('{flag_id}')"),
            CallShape::LocalWithOptions => {
                format!("isEnabled('{flag_id}', {{ screenName: 'Home' }})")
            }
            CallShape::LocalPlain => format!("isEnabled('{flag_id}')"),
        }
    }
}

impl std::fmt::Display for CallShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
