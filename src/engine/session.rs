//! One mutation run: a document plus the configuration that drives it.
//!
//! A session is configured once, loaded with a document once and mutated
//! once. Structural mode rewrites values in place and keeps the container
//! shape; strong mode hands the whole serialized document to the oracle and
//! returns whatever bytes come back.

use std::collections::BTreeSet;

use rand_chacha::ChaCha20Rng;
use tracing::{debug, warn};

use crate::{
    expand_techniques, gen_seed, render, rng_from_seed, serialize, BehaviorModel, BehaviorWeights,
    JfuzzError, JfuzzResult, Map, MutationOracle, Value,
};

pub const MAX_FUZZ_FACTOR: u8 = 6;

/// Field that holds a non-object top-level document while it is mutated.
pub const ARRAY_SENTINEL: &str = "array";

/// Field of the document substituted for malformed input in lenient mode.
pub const PLACEHOLDER_FIELD: &str = "dummy";

/// Validates a raw fuzz factor.
pub fn fuzz_factor_from(raw: i64) -> JfuzzResult<u8> {
    match u8::try_from(raw) {
        Ok(f) if f <= MAX_FUZZ_FACTOR => Ok(f),
        _ => Err(JfuzzError::InvalidArgument(format!(
            "fuzz factor must be between 0 and {MAX_FUZZ_FACTOR} (got {raw})"
        ))),
    }
}

/// Splits a comma-separated field list. Names are matched verbatim.
pub fn parse_param_filter(raw: &str) -> BTreeSet<String> {
    raw.split(',').map(str::to_string).collect()
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub fuzz_factor: u8,
    /// Only fields with these names (at any depth) are mutated.
    pub param_filter: Option<BTreeSet<String>>,
    /// Technique letters (`CHPTRSX`); `Some("")` still counts as configured.
    pub techniques: Option<String>,
    pub strong_mode: bool,
    pub behavior_mode: bool,
    pub behavior_weights: BehaviorWeights,
    /// Substitute a placeholder document for malformed input instead of
    /// failing.
    pub lenient: bool,
    pub seed: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            fuzz_factor: MAX_FUZZ_FACTOR,
            param_filter: None,
            techniques: None,
            strong_mode: false,
            behavior_mode: false,
            behavior_weights: BehaviorWeights::default(),
            lenient: false,
            seed: None,
        }
    }
}

impl SessionOptions {
    pub fn validate(&self) -> JfuzzResult<()> {
        fuzz_factor_from(i64::from(self.fuzz_factor))?;
        let filtered = self.techniques.is_some() || self.param_filter.is_some();
        if self.behavior_mode && (filtered || self.strong_mode) {
            return Err(JfuzzError::Config(
                "behavior-based fuzzing cannot be combined with techniques, params or strong mode"
                    .to_string(),
            ));
        }
        if self.strong_mode && (filtered || self.behavior_mode) {
            return Err(JfuzzError::Config(
                "strong fuzzing cannot be combined with techniques, params or behavior-based fuzzing"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of mutating a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Structural mode: the mutated tree, already unwrapped if the input was
    /// not an object.
    Structured(Value),
    /// Strong mode: the oracle's output, never reparsed.
    Raw(Vec<u8>),
}

impl Mutation {
    pub fn into_bytes(self, indent: usize) -> Vec<u8> {
        match self {
            Mutation::Structured(value) => render(&value, indent).into_bytes(),
            Mutation::Raw(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) fuzz_factor: u8,
    pub(crate) param_filter: Option<BTreeSet<String>>,
    pub(crate) template_ids: Vec<usize>,
    pub(crate) strong_mode: bool,
    pub(crate) behavior: BehaviorModel,
    pub(crate) rng: ChaCha20Rng,
    lenient: bool,
    seed: u64,
    document: Option<Map>,
    array_wrapped: bool,
    consumed: bool,
}

impl Session {
    pub fn new(options: SessionOptions) -> JfuzzResult<Self> {
        options.validate()?;
        let template_ids = options.techniques.as_deref().map(expand_techniques).unwrap_or_default();
        let seed = options.seed.unwrap_or_else(gen_seed);
        debug!(
            fuzz_factor = options.fuzz_factor,
            strong = options.strong_mode,
            behavior = options.behavior_mode,
            seed,
            "session configured with templates {template_ids:?}"
        );
        Ok(Self {
            fuzz_factor: options.fuzz_factor,
            param_filter: options.param_filter,
            template_ids,
            strong_mode: options.strong_mode,
            behavior: BehaviorModel::new(options.behavior_mode, options.behavior_weights),
            rng: rng_from_seed(seed),
            lenient: options.lenient,
            seed,
            document: None,
            array_wrapped: false,
            consumed: false,
        })
    }

    /// Session for an object found inside an array. Inherits everything but
    /// the document and draws its seed from the parent.
    pub(crate) fn child(&self, seed: u64) -> Self {
        Self {
            fuzz_factor: self.fuzz_factor,
            param_filter: self.param_filter.clone(),
            template_ids: self.template_ids.clone(),
            strong_mode: false,
            behavior: self.behavior.clone(),
            rng: rng_from_seed(seed),
            lenient: self.lenient,
            seed,
            document: None,
            array_wrapped: false,
            consumed: false,
        }
    }

    /// Parses and installs the source document. Malformed input is an error
    /// unless the session is lenient, in which case a placeholder document
    /// is used.
    pub fn load(&mut self, text: &str) -> JfuzzResult<()> {
        if self.document.is_some() || self.consumed {
            return Err(JfuzzError::AlreadyLoaded);
        }
        let value = match Value::parse(text) {
            Ok(value) => value,
            Err(err) if self.lenient => {
                warn!("{err}; substituting placeholder document");
                let mut placeholder = Map::new();
                placeholder.insert(
                    PLACEHOLDER_FIELD.to_string(),
                    Value::Text(PLACEHOLDER_FIELD.to_string()),
                );
                Value::Object(placeholder)
            }
            Err(err) => return Err(err),
        };
        self.load_value(value)
    }

    /// Installs an already-parsed document, wrapping non-objects under
    /// [`ARRAY_SENTINEL`].
    pub fn load_value(&mut self, value: Value) -> JfuzzResult<()> {
        if self.document.is_some() || self.consumed {
            return Err(JfuzzError::AlreadyLoaded);
        }
        let document = match value {
            Value::Object(map) => map,
            other => {
                let mut wrapper = Map::new();
                wrapper.insert(ARRAY_SENTINEL.to_string(), other);
                self.array_wrapped = true;
                wrapper
            }
        };
        self.document = Some(document);
        Ok(())
    }

    /// Mutates the loaded document. Consumes the session even on failure.
    pub fn mutate(&mut self, oracle: &mut dyn MutationOracle) -> JfuzzResult<Mutation> {
        if self.consumed {
            return Err(JfuzzError::AlreadyConsumed);
        }
        let mut document = self.document.take().ok_or(JfuzzError::NotLoaded)?;
        self.consumed = true;

        if self.strong_mode {
            let payload = serialize(&self.unwrap_document(document), 0);
            debug!(len = payload.len(), "strong mode: handing whole document to oracle");
            return Ok(Mutation::Raw(oracle.mutate(payload.as_bytes())?));
        }

        self.walk_object(&mut document, oracle)?;
        Ok(Mutation::Structured(self.unwrap_document(document)))
    }

    /// Mutates and renders in one step.
    pub fn fuzz(&mut self, oracle: &mut dyn MutationOracle, indent: usize) -> JfuzzResult<Vec<u8>> {
        Ok(self.mutate(oracle)?.into_bytes(indent))
    }

    fn unwrap_document(&self, mut document: Map) -> Value {
        if self.array_wrapped {
            if let Some(inner) = document.shift_remove(ARRAY_SENTINEL) {
                return inner;
            }
        }
        Value::Object(document)
    }

    pub fn behavior(&self) -> &BehaviorModel {
        &self.behavior
    }

    /// Mutable access for feedback loops that call
    /// [`BehaviorModel::reinforce`].
    pub fn behavior_mut(&mut self) -> &mut BehaviorModel {
        &mut self.behavior
    }

    pub fn template_ids(&self) -> &[usize] {
        &self.template_ids
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn was_wrapped(&self) -> bool {
        self.array_wrapped
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    pub fn document(&self) -> Option<&Map> {
        self.document.as_ref()
    }
}
