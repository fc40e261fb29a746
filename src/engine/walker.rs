//! Depth-first traversal for structural mode.

use rand_core::RngCore as _;
use tracing::{debug, trace};

use crate::{
    bool_action, choose_action, int_action, null_action, text_action, JfuzzResult, Map,
    MutationOracle, Session, TextContext, Value, ValueKind,
};

impl Session {
    /// Mutates every eligible field of `map` in place. Nested objects are
    /// walked with the same session; the field filter applies at every
    /// level by name.
    pub(crate) fn walk_object(&mut self, map: &mut Map, oracle: &mut dyn MutationOracle) -> JfuzzResult<()> {
        for (key, value) in map.iter_mut() {
            let filtered_out = self
                .param_filter
                .as_ref()
                .is_some_and(|filter| !filter.contains(key));
            if filtered_out {
                continue;
            }
            match value {
                Value::Object(inner) => self.walk_object(inner, oracle)?,
                Value::Array(items) => self.walk_array(items, oracle)?,
                Value::Float(_) | Value::Number(_) => {}
                scalar => {
                    if let Some(mutated) = self.mutate_selected(scalar, oracle)? {
                        trace!(field = %key, "field mutated");
                        *scalar = mutated;
                    }
                }
            }
        }
        Ok(())
    }

    /// Rebuilds `items` from a snapshot so replacements never shift the
    /// positions still to be visited. Objects inside arrays run in a child
    /// session of their own.
    pub(crate) fn walk_array(&mut self, items: &mut Vec<Value>, oracle: &mut dyn MutationOracle) -> JfuzzResult<()> {
        let snapshot = std::mem::take(items);
        let mut rebuilt = Vec::with_capacity(snapshot.len());
        for element in snapshot {
            let element = match element {
                Value::Array(mut inner) => {
                    self.walk_array(&mut inner, oracle)?;
                    Value::Array(inner)
                }
                Value::Object(obj) => self.run_child(obj, oracle)?,
                Value::Float(_) | Value::Number(_) => element,
                scalar => match self.mutate_selected(&scalar, oracle)? {
                    Some(mutated) => mutated,
                    None => scalar,
                },
            };
            rebuilt.push(element);
        }
        *items = rebuilt;
        Ok(())
    }

    /// Applies the kind's action table if the behavior model selects the
    /// value. Returns `None` when the value is left alone.
    fn mutate_selected(&mut self, value: &Value, oracle: &mut dyn MutationOracle) -> JfuzzResult<Option<Value>> {
        let Some(kind) = value.kind() else {
            return Ok(None);
        };
        if !self.behavior.is_selected(&mut self.rng, kind) {
            return Ok(None);
        }
        let factor = self.behavior.effective_factor(kind, self.fuzz_factor);
        let action = choose_action(&mut self.rng, factor);
        trace!(%kind, factor, action, "applying action");

        let mutated = match (kind, value) {
            (ValueKind::Null, _) => null_action(action),
            (ValueKind::Bool, Value::Bool(b)) => bool_action(*b, action),
            (ValueKind::Int, Value::Int(x)) => int_action(*x, action, &mut self.rng),
            (ValueKind::Text, Value::Text(s)) => {
                let mut ctx = TextContext {
                    rng: &mut self.rng,
                    oracle,
                    template_ids: &self.template_ids,
                };
                text_action(s, action, &mut ctx)?
            }
            _ => return Ok(None),
        };
        Ok(Some(mutated))
    }

    /// Walks `obj` in a child session and returns the result as the parent
    /// would see it after reparsing the rendered text. Children are always
    /// structural and never wrapped.
    fn run_child(&mut self, mut obj: Map, oracle: &mut dyn MutationOracle) -> JfuzzResult<Value> {
        let seed = self.rng.next_u64();
        debug!(fields = obj.len(), seed, "child session for array element");
        let mut child = self.child(seed);
        child.walk_object(&mut obj, oracle)?;
        Ok(Value::Object(obj).decode_escapes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_param_filter, BehaviorWeights, Mutation, SessionOptions};

    fn session(fuzz_factor: u8, seed: u64) -> Session {
        Session::new(SessionOptions {
            fuzz_factor,
            seed: Some(seed),
            ..SessionOptions::default()
        })
        .expect("session")
    }

    fn no_oracle(_: &[u8]) -> Vec<u8> {
        panic!("oracle must not be called at factor 0")
    }

    fn structured(m: Mutation) -> Value {
        match m {
            Mutation::Structured(v) => v,
            Mutation::Raw(_) => panic!("expected structured output"),
        }
    }

    #[test]
    fn factor_zero_applies_first_action_everywhere() {
        let mut s = session(0, 1);
        s.load(r#"{"i":5,"b":true,"t":"abc","n":null,"f":1.5,"o":{"i":1}}"#).expect("load");
        let out = structured(s.mutate(&mut no_oracle).expect("mutate"));
        let map = out.as_object().expect("object");
        assert_eq!(map["i"], Value::Int(5 ^ 0xffffff));
        assert_eq!(map["b"], Value::Bool(false));
        assert_eq!(map["t"], Value::Text("cba".to_string()));
        assert!(matches!(map["n"], Value::Float(f) if f.is_nan()));
        assert_eq!(map["f"], Value::parse("1.5").expect("number"));
        assert_eq!(map["o"].as_object().expect("nested")["i"], Value::Int(1 ^ 0xffffff));
    }

    #[test]
    fn arrays_keep_length_and_order() {
        let mut s = session(0, 2);
        s.load(r#"{"a":[1,1,"xy",[true,null],2.5]}"#).expect("load");
        let out = structured(s.mutate(&mut no_oracle).expect("mutate"));
        let expected = Value::Array(vec![
            Value::Int(1 ^ 0xffffff),
            Value::Int(1 ^ 0xffffff),
            Value::Text("yx".to_string()),
            Value::Array(vec![Value::Bool(false), Value::Float(f64::NAN)]),
            Value::parse("2.5").expect("number"),
        ]);
        let got = &out.as_object().expect("object")["a"];
        let (Value::Array(got), Value::Array(want)) = (got, &expected) else {
            panic!("expected arrays");
        };
        assert_eq!(got.len(), want.len());
        assert_eq!(got[..3], want[..3]);
        assert_eq!(got[4], want[4]);
        let Value::Array(inner) = &got[3] else {
            panic!("expected nested array");
        };
        assert_eq!(inner[0], Value::Bool(false));
        assert!(matches!(inner[1], Value::Float(f) if f.is_nan()));
    }

    #[test]
    fn objects_in_arrays_get_child_sessions_with_inherited_filter() {
        let mut s = Session::new(SessionOptions {
            fuzz_factor: 0,
            param_filter: Some(parse_param_filter("list,x")),
            seed: Some(3),
            ..SessionOptions::default()
        })
        .expect("session");
        s.load(r#"{"list":[{"x":1,"y":1},7],"y":1}"#).expect("load");
        let out = structured(s.mutate(&mut no_oracle).expect("mutate"));
        let map = out.as_object().expect("object");
        assert_eq!(map["y"], Value::Int(1));
        let Value::Array(list) = &map["list"] else {
            panic!("expected array");
        };
        let child = list[0].as_object().expect("child object");
        assert_eq!(child["x"], Value::Int(1 ^ 0xffffff));
        assert_eq!(child["y"], Value::Int(1));
        assert_eq!(list[1], Value::Int(7 ^ 0xffffff));
    }

    #[test]
    fn filter_skips_unnamed_containers_entirely() {
        let mut s = Session::new(SessionOptions {
            fuzz_factor: 0,
            param_filter: Some(parse_param_filter("x")),
            seed: Some(4),
            ..SessionOptions::default()
        })
        .expect("session");
        s.load(r#"{"outer":{"x":1},"x":2}"#).expect("load");
        let out = structured(s.mutate(&mut no_oracle).expect("mutate"));
        let map = out.as_object().expect("object");
        assert_eq!(map["outer"].as_object().expect("outer")["x"], Value::Int(1));
        assert_eq!(map["x"], Value::Int(2 ^ 0xffffff));
    }

    #[test]
    fn child_results_are_decoded_like_a_reparse() {
        let mut s = Session::new(SessionOptions {
            param_filter: Some(parse_param_filter("untouched")),
            seed: Some(5),
            ..SessionOptions::default()
        })
        .expect("session");
        let mut escaped = String::from("x");
        escaped.push('\\');
        escaped.push_str("u0041y");
        let mut obj = Map::new();
        obj.insert("t".to_string(), Value::Text(escaped));
        let out = s.run_child(obj, &mut no_oracle).expect("child");
        assert_eq!(out.as_object().expect("object")["t"], Value::Text("xAy".to_string()));
    }

    #[test]
    fn child_sessions_only_use_configured_templates() {
        let victims = ["victim", "other"];
        let allowed: Vec<String> = victims
            .iter()
            .flat_map(|v| {
                [
                    (*v).to_string(),
                    format!("/../../../../etc/{v}"),
                    format!(r"..\..\..\..\{v}.ini"),
                ]
            })
            .collect();
        let mut templated = 0usize;
        for seed in 0..200u64 {
            let mut s = Session::new(SessionOptions {
                techniques: Some("P".to_string()),
                seed: Some(seed),
                ..SessionOptions::default()
            })
            .expect("session");
            s.load(r#"{"list":[{"s":"victim","t":"other"}]}"#).expect("load");
            let mut payloads = Vec::new();
            let mut oracle = |input: &[u8]| {
                payloads.push(String::from_utf8_lossy(input).to_string());
                input.to_vec()
            };
            s.mutate(&mut oracle).expect("mutate");
            for payload in &payloads {
                assert!(allowed.contains(payload), "seed {seed} sent {payload:?}");
                if !victims.contains(&payload.as_str()) {
                    templated += 1;
                }
            }
        }
        assert!(templated > 0);
    }

    #[test]
    fn child_sessions_inherit_behavior_weights() {
        let mut weights = BehaviorWeights::default();
        weights.set(ValueKind::Int, 0.0).expect("set");
        for seed in 0..50u64 {
            let mut s = Session::new(SessionOptions {
                behavior_mode: true,
                behavior_weights: weights.clone(),
                seed: Some(seed),
                ..SessionOptions::default()
            })
            .expect("session");
            let child = s.child(seed);
            assert!(child.behavior().enabled());
            assert_eq!(child.behavior().weights(), &weights);

            s.load(r#"{"list":[{"i":5,"deep":[{"j":7}]},9]}"#).expect("load");
            let mut oracle = |input: &[u8]| input.to_vec();
            let out = structured(s.mutate(&mut oracle).expect("mutate"));
            let Value::Array(list) = &out.as_object().expect("object")["list"] else {
                panic!("expected array");
            };
            let child = list[0].as_object().expect("child object");
            assert_eq!(child["i"], Value::Int(5), "seed {seed}");
            let Value::Array(deep) = &child["deep"] else {
                panic!("expected nested array");
            };
            assert_eq!(deep[0].as_object().expect("grandchild")["j"], Value::Int(7), "seed {seed}");
            assert_eq!(list[1], Value::Int(9), "seed {seed}");
        }
    }

    #[test]
    fn zero_weight_kinds_are_untouched_in_behavior_mode() {
        let mut weights = BehaviorWeights::default();
        weights.set(ValueKind::Int, 0.0).expect("set");
        let mut s = Session::new(SessionOptions {
            fuzz_factor: 0,
            behavior_mode: true,
            behavior_weights: weights,
            seed: Some(6),
            ..SessionOptions::default()
        })
        .expect("session");
        s.load(r#"{"i":5,"b":true,"arr":[1,2]}"#).expect("load");
        let out = structured(s.mutate(&mut no_oracle).expect("mutate"));
        let map = out.as_object().expect("object");
        assert_eq!(map["i"], Value::Int(5));
        assert_eq!(map["arr"], Value::Array(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(map["b"], Value::Bool(false));
    }
}
