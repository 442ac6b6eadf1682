//! Macros to reduce boilerplate in layer implementations

/// Implements the `LayerTrait` methods that only forward to a
/// [`LayerProperties`](crate::layers::base::LayerProperties) field:
/// `name`, `layer_type`, `is_visible`, `set_visible`, `attach`, `detach`
/// and `as_any`.
///
/// Usage inside an `impl LayerTrait for MyLayer` block:
/// ```ignore
/// impl_layer_trait!(properties);
/// ```
#[macro_export]
macro_rules! impl_layer_trait {
    ($properties_field:ident) => {
        fn name(&self) -> &str {
            &self.$properties_field.name
        }

        fn layer_type(&self) -> $crate::layers::base::LayerType {
            self.$properties_field.layer_type
        }

        fn is_visible(&self, zoom: i32) -> bool {
            self.$properties_field.is_visible(zoom)
        }

        fn set_visible(&self, visible: bool) {
            self.$properties_field.set_visible(visible);
        }

        fn attach(&self, signals: $crate::input::events::SignalSender) {
            self.$properties_field.attach(signals);
        }

        fn detach(&self) {
            self.$properties_field.detach();
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    };
}
