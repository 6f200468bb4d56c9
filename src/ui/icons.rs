//! Icons for terminal summaries, with plain-text fallbacks.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static PR: Emoji<'_, '_> = Emoji("🔀 ", "[PR]");
pub static PROGRESS: Emoji<'_, '_> = Emoji("📊 ", "[SUM]");
pub static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[?]");
