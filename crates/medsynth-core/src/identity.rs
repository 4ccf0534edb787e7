//! Synthetic identity fragments: names, contact details, and provider NPIs.
//!
//! Values are structurally valid but drawn from small fixed pools, so they
//! never reproduce a real person.

use rand::{seq::SliceRandom, Rng};

use medsynth_contracts::patient::Gender;

const MALE_FIRST_NAMES: &[&str] = &[
    "James", "Robert", "John", "Michael", "David", "William", "Richard", "Joseph", "Thomas",
    "Charles", "Christopher", "Daniel", "Matthew", "Anthony", "Mark", "Donald", "Steven", "Paul",
    "Andrew", "Joshua", "Kenneth", "Kevin", "Brian", "George", "Timothy", "Ronald", "Edward",
    "Jason", "Jeffrey", "Ryan", "Jacob", "Gary", "Nicholas", "Eric", "Jonathan",
];

const FEMALE_FIRST_NAMES: &[&str] = &[
    "Mary", "Patricia", "Jennifer", "Linda", "Elizabeth", "Barbara", "Susan", "Jessica", "Sarah",
    "Karen", "Lisa", "Nancy", "Betty", "Margaret", "Sandra", "Ashley", "Kimberly", "Emily",
    "Donna", "Michelle", "Carol", "Amanda", "Dorothy", "Melissa", "Deborah", "Stephanie",
    "Rebecca", "Sharon", "Laura", "Cynthia", "Kathleen", "Amy", "Angela", "Shirley", "Anna",
];

const NEUTRAL_FIRST_NAMES: &[&str] = &[
    "Alex", "Jordan", "Taylor", "Morgan", "Casey", "Riley", "Jamie", "Avery", "Quinn", "Rowan",
    "Sage", "Skyler", "Dakota", "Reese", "Emerson",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez",
    "Clark", "Ramirez", "Lewis", "Robinson", "Walker", "Young", "Allen", "King", "Wright",
    "Scott", "Torres", "Nguyen", "Hill", "Flores", "Green", "Adams", "Nelson", "Baker", "Hall",
    "Rivera", "Campbell", "Mitchell", "Carter", "Roberts",
];

const STREET_NAMES: &[&str] = &[
    "Oak", "Maple", "Cedar", "Pine", "Elm", "Washington", "Lake", "Hill", "Park", "Main",
    "Walnut", "Sunset", "Highland", "River", "Jackson", "Franklin", "Chestnut", "Willow",
];

const STREET_SUFFIXES: &[&str] = &["St", "Ave", "Rd", "Blvd", "Ln", "Dr", "Ct", "Way"];

/// City, state abbreviation, and the three-digit ZIP prefix serving it.
const CITIES: &[(&str, &str, &str)] = &[
    ("Springfield", "IL", "627"),
    ("Columbus", "OH", "432"),
    ("Austin", "TX", "787"),
    ("Denver", "CO", "802"),
    ("Portland", "OR", "972"),
    ("Nashville", "TN", "372"),
    ("Madison", "WI", "537"),
    ("Raleigh", "NC", "276"),
    ("Sacramento", "CA", "958"),
    ("Phoenix", "AZ", "850"),
    ("Richmond", "VA", "232"),
    ("Albany", "NY", "122"),
    ("Tallahassee", "FL", "323"),
    ("Boise", "ID", "837"),
    ("Omaha", "NE", "681"),
    ("Louisville", "KY", "402"),
    ("Salt Lake City", "UT", "841"),
    ("Hartford", "CT", "061"),
    ("Des Moines", "IA", "503"),
    ("Atlanta", "GA", "303"),
];

const EMAIL_DOMAINS: &[&str] = &["gmail.com", "yahoo.com", "hotmail.com", "outlook.com", "aol.com"];

const PROVIDER_SURNAMES: &[&str] = &[
    "Patel", "Chen", "Okafor", "Schmidt", "Kowalski", "Rossi", "Haddad", "Tanaka", "Murphy",
    "Johansson", "Alvarez", "Kim",
];

fn pick<'a, R: Rng>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

pub fn first_name<R: Rng>(rng: &mut R, gender: Gender) -> String {
    let pool = match gender {
        Gender::Male => MALE_FIRST_NAMES,
        Gender::Female => FEMALE_FIRST_NAMES,
        Gender::Other => NEUTRAL_FIRST_NAMES,
    };
    pick(rng, pool).to_string()
}

pub fn last_name<R: Rng>(rng: &mut R) -> String {
    pick(rng, LAST_NAMES).to_string()
}

/// `AAA-GG-SSSS` with area 001–899 (never 666), group 01–99, serial
/// 0001–9999.
pub fn ssn<R: Rng>(rng: &mut R) -> String {
    let mut area = rng.gen_range(1..=899);
    if area == 666 {
        area = 665;
    }
    let group = rng.gen_range(1..=99);
    let serial = rng.gen_range(1..=9999);
    format!("{area:03}-{group:02}-{serial:04}")
}

/// `(AAA) EEE-NNNN`.
pub fn phone<R: Rng>(rng: &mut R) -> String {
    let area = rng.gen_range(200..=999);
    let exchange = rng.gen_range(200..=999);
    let number = rng.gen_range(1000..=9999);
    format!("({area}) {exchange}-{number}")
}

pub fn email<R: Rng>(rng: &mut R, first_name: &str, last_name: &str) -> String {
    format!(
        "{}.{}@{}",
        first_name.to_lowercase(),
        last_name.to_lowercase(),
        pick(rng, EMAIL_DOMAINS)
    )
}

/// Street address, city, state, and five-digit ZIP.
pub fn address<R: Rng>(rng: &mut R) -> (String, String, String, String) {
    let street = format!(
        "{} {} {}",
        rng.gen_range(100..=9999),
        pick(rng, STREET_NAMES),
        pick(rng, STREET_SUFFIXES)
    );
    let (city, state, zip_prefix) = CITIES.choose(rng).copied().unwrap_or(CITIES[0]);
    let zip = format!("{zip_prefix}{:02}", rng.gen_range(1..=99));
    (street, city.to_string(), state.to_string(), zip)
}

/// Ten-digit National Provider Identifier.
pub fn npi<R: Rng>(rng: &mut R) -> String {
    rng.gen_range(1_000_000_000u64..=9_999_999_999).to_string()
}

/// A provider display name such as `Dr. Maria Chen`.
pub fn provider_name<R: Rng>(rng: &mut R) -> String {
    let gender = if rng.gen_bool(0.5) { Gender::Female } else { Gender::Male };
    format!("Dr. {} {}", first_name(rng, gender), pick(rng, PROVIDER_SURNAMES))
}
