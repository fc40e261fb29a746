//! Per-kind action tables. Each table has seven actions; a factor `f`
//! restricts the draw to actions `0..=f`.

use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::{
    choose_template, escape_unprintable, pick_inclusive, render_template, JfuzzResult, Map,
    MutationOracle, Value,
};

pub const ACTION_COUNT: u8 = 7;

/// Draws an action id uniformly from `0..=factor`.
pub fn choose_action(rng: &mut ChaCha20Rng, factor: u8) -> u8 {
    pick_inclusive(rng, 0, i64::from(factor.min(ACTION_COUNT - 1))) as u8
}

pub fn null_action(action: u8) -> Value {
    match action {
        0 => Value::Float(f64::NAN),
        1 => Value::Int(0),
        2 => Value::Bool(false),
        3 => Value::Float(f64::INFINITY),
        4 => Value::Object(Map::new()),
        5 => Value::Array(vec![Value::Int(0)]),
        _ => Value::Float(f64::NEG_INFINITY),
    }
}

pub fn bool_action(b: bool, action: u8) -> Value {
    match action {
        0 => Value::Bool(!b),
        1 => Value::Text(title_case_bool(b).to_string()),
        2 => Value::Text(title_case_bool(!b).to_string()),
        3 => Value::Int(i64::from(b)),
        4 => Value::Int(i64::from(!b)),
        5 => Value::Float(f64::from(u8::from(b))),
        _ => Value::Float(f64::from(u8::from(!b))),
    }
}

/// Integer arithmetic wraps at 64 bits.
pub fn int_action(x: i64, action: u8, rng: &mut ChaCha20Rng) -> Value {
    match action {
        0 => Value::Int(x ^ 0xff_ffff),
        1 => Value::Int(x.wrapping_neg()),
        2 => Value::Int(x.wrapping_mul(x)),
        3 => Value::Int(x | 0xff),
        4 => Value::Int(pick_inclusive(rng, -i64::from(i32::MAX), i64::from(i32::MAX))),
        5 => Value::Bool(x != 0),
        _ => Value::Int(x | 0xff00_0000),
    }
}

/// Inputs the oracle-backed text actions need.
pub struct TextContext<'a> {
    pub rng: &'a mut ChaCha20Rng,
    pub oracle: &'a mut dyn MutationOracle,
    pub template_ids: &'a [usize],
}

pub fn text_action(text: &str, action: u8, ctx: &mut TextContext<'_>) -> JfuzzResult<Value> {
    Ok(match action {
        0 => Value::Text(text.chars().rev().collect()),
        1 => Value::Text(attack(ctx, text)?),
        2 => Value::Text(String::new()),
        3 => Value::Array(vec![Value::Text(text.to_string())]),
        4 => Value::Bool(false),
        5 => {
            let raw = ctx.oracle.mutate(text.as_bytes())?;
            let mut map = Map::new();
            map.insert("param".to_string(), Value::Text(escape_unprintable(&raw)));
            Value::Object(map)
        }
        _ => Value::Int(0),
    })
}

/// Fills a randomly chosen attack template with `victim`, runs it through
/// the oracle and escapes whatever comes back.
pub fn attack(ctx: &mut TextContext<'_>, victim: &str) -> JfuzzResult<String> {
    let id = choose_template(ctx.rng, ctx.template_ids);
    let payload = render_template(ctx.rng, id, victim);
    trace!(template = id, "attack payload built");
    let out = ctx.oracle.mutate(payload.as_bytes())?;
    Ok(escape_unprintable(&out))
}

fn title_case_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}
