// src/codegen/builder.rs
//
// The class-builder sink behind the emission stage. The factory trait keeps
// the actual container format opaque; the text builder is the shipped
// implementation and renders a stable, diffable listing.

use std::any::Any;
use std::cell::RefCell;
use std::path::PathBuf;

/// One binary output container under construction.
pub trait ClassBuilder {
    fn begin_class(&mut self, binary_name: &str, kind: &str);
    fn annotate(&mut self, annotation: &str);
    fn declare_field(&mut self, name: &str, ty: &str);
    fn declare_method(&mut self, name: &str, descriptor: &str);
    fn end_class(&mut self);

    /// Downcast hook for factories rendering their own builders.
    fn as_any(&self) -> &dyn Any;
}

/// Creates builders and renders finished ones.
pub trait ClassBuilderFactory {
    fn new_builder(&self) -> Box<dyn ClassBuilder>;
    fn as_text(&self, builder: &dyn ClassBuilder) -> String;
    fn as_bytes(&self, builder: &dyn ClassBuilder) -> Vec<u8>;
}

/// Line-oriented textual class builder.
#[derive(Debug, Default)]
pub struct TextClassBuilder {
    lines: Vec<String>,
    ended: bool,
}

impl TextClassBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, line: String) {
        if self.ended {
            panic!("write to finished class builder");
        }
        self.lines.push(line);
    }

    pub fn listing(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

impl ClassBuilder for TextClassBuilder {
    fn begin_class(&mut self, binary_name: &str, kind: &str) {
        self.push(format!("{kind} {binary_name}"));
    }

    fn annotate(&mut self, annotation: &str) {
        self.push(format!("  @{annotation}"));
    }

    fn declare_field(&mut self, name: &str, ty: &str) {
        self.push(format!("  field {name}: {ty}"));
    }

    fn declare_method(&mut self, name: &str, descriptor: &str) {
        self.push(format!("  method {name}: {descriptor}"));
    }

    fn end_class(&mut self) {
        self.push("end".to_string());
        self.ended = true;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory producing [`TextClassBuilder`]s.
#[derive(Debug, Default)]
pub struct TextBuilderFactory;

impl TextBuilderFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ClassBuilderFactory for TextBuilderFactory {
    fn new_builder(&self) -> Box<dyn ClassBuilder> {
        Box::new(TextClassBuilder::new())
    }

    fn as_text(&self, builder: &dyn ClassBuilder) -> String {
        match builder.as_any().downcast_ref::<TextClassBuilder>() {
            Some(text) => text.listing(),
            None => panic!("text factory asked to render a foreign builder"),
        }
    }

    fn as_bytes(&self, builder: &dyn ClassBuilder) -> Vec<u8> {
        self.as_text(builder).into_bytes()
    }
}

/// Build-system callback for source-to-output dependency edges.
pub trait ProgressTracker {
    fn report_output(&self, sources: &[PathBuf], output: &str);
}

/// Tracker that drops every report.
#[derive(Debug, Default)]
pub struct NullTracker;

impl ProgressTracker for NullTracker {
    fn report_output(&self, _sources: &[PathBuf], _output: &str) {}
}

/// Tracker recording every reported edge, for the driver and tests.
#[derive(Debug, Default)]
pub struct CollectingTracker {
    edges: RefCell<Vec<(Vec<PathBuf>, String)>>,
}

impl CollectingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edges(&self) -> Vec<(Vec<PathBuf>, String)> {
        self.edges.borrow().clone()
    }
}

impl ProgressTracker for CollectingTracker {
    fn report_output(&self, sources: &[PathBuf], output: &str) {
        tracing::debug!(output, sources = sources.len(), "recorded output edge");
        self.edges
            .borrow_mut()
            .push((sources.to_vec(), output.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_builder_renders_a_listing() {
        let factory = TextBuilderFactory::new();
        let mut builder = factory.new_builder();
        builder.begin_class("demo/Box", "class");
        builder.annotate("sable.runtime.SableCompiled");
        builder.declare_field("size", "i32");
        builder.declare_method("clear", "() -> unit");
        builder.end_class();

        let text = factory.as_text(builder.as_ref());
        assert_eq!(
            text,
            "class demo/Box\n  @sable.runtime.SableCompiled\n  field size: i32\n  method clear: () -> unit\nend\n"
        );
        assert_eq!(factory.as_bytes(builder.as_ref()), text.into_bytes());
    }

    #[test]
    #[should_panic(expected = "write to finished class builder")]
    fn writing_after_end_is_fatal() {
        let mut builder = TextClassBuilder::new();
        builder.begin_class("demo/Box", "class");
        builder.end_class();
        builder.declare_field("late", "i32");
    }
}
