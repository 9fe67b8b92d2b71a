//! Names of the runtime objects the generated program defines.

// ── Factory parameters ───────────────────────────────────────────────────────

/// The host global object.
pub const ROOT: &str = "__root";
/// `name -> Promise<bytes>`, resolving `name` next to the running script.
pub const FETCHER: &str = "__fetcher";

// ── Linkage containers ───────────────────────────────────────────────────────

/// Public API object, frozen and returned once instantiation completes.
pub const EXPORTS: &str = "__exports";
/// Cross-file symbols; also the Wasm `env` import object.
pub const SYMBOLS: &str = "__symbols";

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Trampoline factory used by late-bound symbol imports.
pub const LATE_BINDING: &str = "__lateBinding";

/// Every name above. Requirement identifiers must avoid these.
pub const RESERVED_NAMES: &[&str] = &[ROOT, FETCHER, EXPORTS, SYMBOLS, LATE_BINDING];

/// Host globals the emitted scaffolding itself references.
pub const RUNTIME_GLOBALS: &[&str] = &[
    "WebAssembly",
    "Promise",
    "Object",
    "Error",
    "require",
    "module",
    "define",
    "global",
    "self",
    "__dirname",
];
