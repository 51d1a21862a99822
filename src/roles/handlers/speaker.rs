use super::{command, percent_spec};
use crate::accessory::{CharValue, CharacteristicSpec, CharacteristicType, Materializer, ServiceType};
use crate::device::CapabilitySet;
use crate::roles::Role;

/// Speakers and media players with a volume control.
pub struct SpeakerRole;

impl Role for SpeakerRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("AudioVolume")
            || (caps.has_capability("MusicPlayer") && caps.has_attribute("volume"))
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let caps = m.caps();
        let key = m.service(ServiceType::Speaker, None, None);

        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::Mute, |d, _| {
                CharValue::Bool(d.attribute_str("mute").is_some_and(|v| v.eq_ignore_ascii_case("muted")))
            })
            .on_set(|_, _, value| {
                if value.as_bool().unwrap_or(false) {
                    command("mute")
                } else {
                    command("unmute")
                }
            })
            .subscribe(&["mute"])
            .requires(caps.has_command("mute") && caps.has_command("unmute")),
        );
        m.characteristic(
            &key,
            percent_spec(CharacteristicType::Volume, "volume", "setVolume")
                .requires(caps.has_attribute("volume") && caps.has_command("setVolume")),
        );
    }
}
