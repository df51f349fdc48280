//! Instruction templates for the two classification tasks.

pub const RELEVANCE_SYSTEM: &str = "Respond with valid JSON array only.";
pub const RELEVANCE_MAX_TOKENS: u32 = 500;

pub const PERSONALITY_SYSTEM: &str =
    "You are a strict TikTok creator filter. Respond with ACCEPT or REJECT only.";
pub const PERSONALITY_MAX_TOKENS: u32 = 20;

/// Asks which trending keywords lead to user-generated content.
///
/// `keywords_json` must be a JSON array of strings.
#[must_use]
pub fn relevance_prompt(keywords_json: &str) -> String {
    format!(
        r#"You are a TikTok Trend Classifier. Identify keywords that lead to "User-Generated Content" (Creators) rather than "Mass Media" (News/TV).

KEEP: "Creator Formats"
- Challenges, Dances, Skits, "Girl Math", trends
- Visual inspiration: "Outfit", "Tutorial", "Ideas"
- Routines and hauls: "Essentials", "What I Eat", "Unboxing"
- Lifestyle: "Gymtok", "Corporate Life", "Run Club"

DISCARD: "Passive Consumption"
- News: "Election", "Hurricane", "Price", "Deals"
- Sports: matchups, scores
- Celebrity gossip (unless parody)
- Official media: movie/TV titles, trailers
- E-commerce: "iPhone Price", "Coupon"

Return ONLY a JSON array of keywords to KEEP:

{keywords_json}"#
    )
}

/// Asks whether an account is an individual creator worth tracking.
#[must_use]
pub fn personality_prompt(handle: &str, display_name: &str, bio: &str) -> String {
    let display_name = if display_name.trim().is_empty() {
        "(none)"
    } else {
        display_name
    };
    let bio = if bio.trim().is_empty() { "(no bio)" } else { bio };

    format!(
        r#"You are a TikTok creator quality filter. Decide whether this account is a REAL CREATOR worth tracking.

ACCEPT (real creators):
- Individual people who appear on camera
- Personal brands, influencers, content creators
- People doing challenges, dances, skits, vlogs
- Beauty, fashion, or fitness creators showing themselves
- Musicians and artists promoting their own work
- Names that look like real people (first names, nicknames)

REJECT (not real creators):
- Fan pages, stan accounts, update accounts
- News or media accounts, celebrity gossip
- Compilation or clip channels, "best of" accounts
- Brand accounts, corporate pages
- Meme repost accounts
- Usernames containing "daily", "clips", "updates", "news", "fan", "stan", "archive", "tv", "media", "official" (unless it is the actual celebrity)
- Generic usernames like "user123456"
- Tech or gadget review accounts (unless a personal brand)
- Sports highlight accounts

Account:
- Username: @{handle}
- Display Name: {display_name}
- Bio: {bio}

Using every signal (username pattern, display name, bio), is this a real individual creator?

Respond with ONLY: ACCEPT or REJECT"#
    )
}
