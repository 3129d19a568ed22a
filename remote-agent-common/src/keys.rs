//! Cross-platform key name normalization, ported verbatim from the agent's
//! original `KEY_NAME_ALIASES` table so that clients can send either raw
//! platform key names or the common aliases below and get the same
//! canonical name out on every backend.

const KEY_NAME_ALIASES: &[(&str, &str)] = &[
    // Modifier keys
    ("ctrl", "control"),
    ("lctrl", "control"),
    ("rctrl", "control"),
    ("cmd", "super"),
    ("win", "super"),
    ("lwin", "super"),
    ("rwin", "super"),
    ("lalt", "alt"),
    ("ralt", "alt"),
    ("lshift", "shift"),
    ("rshift", "shift"),
    // Special keys
    ("enter", "return"),
    ("esc", "escape"),
    ("backspace", "back"),
    ("del", "delete"),
    ("ins", "insert"),
    ("pageup", "prior"),
    ("pgup", "prior"),
    ("pagedown", "next"),
    ("pgdn", "next"),
    ("capslock", "caps_lock"),
    ("caps", "caps_lock"),
    ("numlock", "num_lock"),
    ("scrolllock", "scroll_lock"),
    ("printscreen", "print_screen"),
    ("prtsc", "print_screen"),
    // Numpad aliases
    ("num0", "numpad0"),
    ("num1", "numpad1"),
    ("num2", "numpad2"),
    ("num3", "numpad3"),
    ("num4", "numpad4"),
    ("num5", "numpad5"),
    ("num6", "numpad6"),
    ("num7", "numpad7"),
    ("num8", "numpad8"),
    ("num9", "numpad9"),
    ("nummul", "numpad_multiply"),
    ("numadd", "numpad_add"),
    ("numsub", "numpad_subtract"),
    ("numdec", "numpad_decimal"),
    ("numdiv", "numpad_divide"),
    // Media keys
    ("volumemute", "volume_mute"),
    ("volumedown", "volume_down"),
    ("volumeup", "volume_up"),
    ("medianext", "media_next"),
    ("mediaprev", "media_prev"),
    ("mediastop", "media_stop"),
    ("mediaplaypause", "media_play_pause"),
    // Symbol aliases
    ("semicolon", ";"),
    ("equals", "="),
    ("plus", "="),
    ("comma", ","),
    ("minus", "-"),
    ("period", "."),
    ("slash", "/"),
    ("backtick", "`"),
    ("bracketleft", "["),
    ("backslash", "\\"),
    ("bracketright", "]"),
    ("quote", "'"),
];

/// Normalize a key name to its canonical form for cross-platform use.
///
/// Lowercases the input, then looks it up in the alias table; keys with no
/// alias pass through lowercased unchanged (e.g. single characters, `"f1"`).
pub fn normalize_key_name(key: &str) -> String {
    let lower = key.to_ascii_lowercase();
    KEY_NAME_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_aliases_normalize() {
        assert_eq!(normalize_key_name("ctrl"), "control");
        assert_eq!(normalize_key_name("LCTRL"), "control");
        assert_eq!(normalize_key_name("cmd"), "super");
        assert_eq!(normalize_key_name("RAlt"), "alt");
    }

    #[test]
    fn special_keys_normalize() {
        assert_eq!(normalize_key_name("esc"), "escape");
        assert_eq!(normalize_key_name("pgup"), "prior");
        assert_eq!(normalize_key_name("pgdn"), "next");
    }

    #[test]
    fn unknown_key_passes_through_lowercased() {
        assert_eq!(normalize_key_name("A"), "a");
        assert_eq!(normalize_key_name("f1"), "f1");
    }

    #[test]
    fn symbol_aliases_map_to_literal_symbol() {
        assert_eq!(normalize_key_name("semicolon"), ";");
        assert_eq!(normalize_key_name("plus"), "=");
        assert_eq!(normalize_key_name("equals"), "=");
    }
}
