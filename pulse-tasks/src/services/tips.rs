use rand::seq::SliceRandom;

const TIPS: &[&str] = &[
    "Custom events let you track sign-ups and downloads alongside pageviews.",
    "Share a read-only link to your dashboard with teammates who do not need an account.",
    "Compare periods side by side to see whether a campaign actually moved your traffic.",
    "Filter the dashboard by country or referrer to find where visitors come from.",
    "Add every domain you own to one project to see combined traffic in a single view.",
    "Switch your report frequency between weekly and monthly in the account settings.",
    "Ignore your own visits by adding your IP address to the project's ignore list.",
];

/// One tip from the static pool, picked at random.
pub fn random_tip() -> &'static str {
    TIPS.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}
