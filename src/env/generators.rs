//! Random test data for `{$generator}` placeholders.

use once_cell::sync::Lazy;
use petname::petname;
use rand::{seq::SliceRandom, Rng};
use regex::Regex;
use uuid::Uuid;

use super::PlaceholderError;

static GENERATOR_SPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)(?::(\d{1,3}))?$").expect("generator pattern"));

const ADJECTIVES: &[&str] = &[
    "Ergonomic",
    "Rustic",
    "Sleek",
    "Handcrafted",
    "Practical",
    "Refined",
    "Gorgeous",
    "Licensed",
    "Tasty",
    "Modern",
];

const MATERIALS: &[&str] = &[
    "Steel", "Wooden", "Granite", "Cotton", "Bronze", "Plastic", "Rubber", "Concrete", "Frozen",
    "Soft",
];

const PRODUCTS: &[&str] = &[
    "Chair", "Table", "Keyboard", "Shoes", "Gloves", "Bike", "Lamp", "Towels", "Mouse", "Hat",
];

const FEATURES: &[&str] = &[
    "a comfortable grip",
    "long-lasting performance",
    "an adjustable fit",
    "a minimalist design",
    "everyday reliability",
    "a lightweight frame",
];

const AUDIENCES: &[&str] = &[
    "home offices",
    "weekend travellers",
    "busy kitchens",
    "outdoor enthusiasts",
    "growing teams",
];

/// Produces a value for a generator spec such as `email` or `numeric:5`.
pub fn generate(spec: &str) -> Result<String, PlaceholderError> {
    let unknown = || PlaceholderError::UnknownGenerator(spec.to_string());
    let captures = GENERATOR_SPEC.captures(spec).ok_or_else(unknown)?;
    let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let arg = captures
        .get(2)
        .and_then(|m| m.as_str().parse::<usize>().ok());

    let mut rng = rand::thread_rng();
    let value = match (name, arg) {
        ("uuid", None) => Uuid::new_v4().to_string(),
        ("username", None) => format!("{}{}", petname(2, "_"), rng.gen_range(10..100)),
        ("email", None) => format!(
            "{}{}@example.com",
            petname(2, "."),
            rng.gen_range(1000..10000)
        ),
        ("productName", None) => format!(
            "{} {} {} {}",
            pick(&mut rng, ADJECTIVES),
            pick(&mut rng, MATERIALS),
            pick(&mut rng, PRODUCTS),
            rng.gen_range(1000..100000)
        ),
        ("productDescription", None) => format!(
            "The {} {} offers {} for {}.",
            pick(&mut rng, ADJECTIVES).to_lowercase(),
            pick(&mut rng, PRODUCTS).to_lowercase(),
            pick(&mut rng, FEATURES),
            pick(&mut rng, AUDIENCES)
        ),
        ("numeric", Some(len)) if len > 0 => (0..len)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect(),
        _ => return Err(unknown()),
    };
    Ok(value)
}

fn pick<R: Rng>(rng: &mut R, words: &[&'static str]) -> &'static str {
    words.choose(rng).copied().unwrap_or("Item")
}
