use super::{command_with, on_state, percent_spec};
use crate::accessory::{CharValue, CharacteristicSpec, CharacteristicType, Materializer, Props, ServiceType};
use crate::convert;
use crate::device::CapabilitySet;
use crate::roles::Role;

const LIGHT_CAPABILITIES: &[&str] = &["SwitchLevel", "ColorControl", "ColorTemperature", "Light", "Bulb"];

/// Dimmable, color and color-temperature bulbs.
pub struct LightRole;

impl Role for LightRole {
    fn is_supported(&self, caps: &CapabilitySet<'_>) -> bool {
        caps.has_capability("Switch")
            && (caps.has_any_capability(LIGHT_CAPABILITIES) || caps.looks_like_light())
    }

    fn configure(&self, m: &mut Materializer<'_>) {
        let caps = m.caps();
        let key = m.service(ServiceType::Lightbulb, None, None);
        m.characteristic(&key, on_state());

        m.characteristic(
            &key,
            percent_spec(CharacteristicType::Brightness, "level", "setLevel").requires(
                caps.has_command("setLevel")
                    && (caps.has_capability("SwitchLevel") || caps.has_attribute("level")),
            ),
        );

        let color = caps.has_capability("ColorControl");
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::Hue, |d, _| {
                CharValue::Float(convert::hue_to_degrees(d.attribute_f64("hue").unwrap_or(0.0)))
            })
            .on_set(|_, _, value| match value.as_f64() {
                Some(degrees) => command_with("setHue", convert::degrees_to_hue(degrees) as i64),
                None => Vec::new(),
            })
            .props(Props::range(0.0, 360.0, 1.0))
            .subscribe(&["hue"])
            .requires(color && caps.has_command("setHue")),
        );
        m.characteristic(
            &key,
            percent_spec(CharacteristicType::Saturation, "saturation", "setSaturation")
                .requires(color && caps.has_command("setSaturation")),
        );

        // Color bulbs only keep color temperature when adaptive lighting is on.
        let color_temperature = caps.has_capability("ColorTemperature")
            && caps.has_command("setColorTemperature")
            && (m.config().adaptive_lighting || !color);
        m.characteristic(
            &key,
            CharacteristicSpec::new(CharacteristicType::ColorTemperature, |d, _| {
                let kelvin = d.attribute_f64("colorTemperature").unwrap_or(0.0);
                CharValue::Int(convert::kelvin_to_mired(kelvin) as i64)
            })
            .on_set(|_, _, value| match value.as_f64() {
                Some(mired) => {
                    command_with("setColorTemperature", convert::mired_to_kelvin(mired) as i64)
                }
                None => Vec::new(),
            })
            .props(Props::range(convert::MIN_MIRED, convert::MAX_MIRED, 1.0))
            .subscribe(&["colorTemperature"])
            .requires(color_temperature),
        );
    }
}
