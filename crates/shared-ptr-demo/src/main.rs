//! Walks through each destruction policy: default, free function, closure,
//! stateful functor and type-erased. Set `RUST_LOG=trace` to also see the
//! control block lifecycle.

use shared_ptr::{Deleter, DynDeleter, DynSharedPtr, SharedPtr};
use std::ptr::NonNull;

struct Widget {
    id: u32,
}

impl Widget {
    fn boxed(id: u32) -> *mut Widget {
        log::info!("Widget {} created", id);
        Box::into_raw(Box::new(Widget { id }))
    }
}

impl Drop for Widget {
    fn drop(&mut self) {
        log::info!("Widget {} destroyed", self.id);
    }
}

fn custom_deleter(ptr: NonNull<Widget>) {
    let widget = unsafe { Box::from_raw(ptr.as_ptr()) };
    log::info!("Custom deleter for Widget {}", widget.id);
}

struct StatefulDeleter {
    message: String,
}

impl Deleter<Widget> for StatefulDeleter {
    fn delete(&mut self, ptr: NonNull<Widget>) {
        let widget = unsafe { Box::from_raw(ptr.as_ptr()) };
        log::info!("{} Widget {}", self.message, widget.id);
    }
}

fn default_deleter() {
    let p1: SharedPtr<Widget> = unsafe { SharedPtr::from_raw(Widget::boxed(1)) };
    let p2 = p1.clone();
    log::info!("use count: {}", p2.use_count());
}

fn function_deleter() {
    let p3 = unsafe {
        SharedPtr::from_raw_with(Widget::boxed(2), custom_deleter as fn(NonNull<Widget>))
    };
    let p4 = p3.clone();
    log::info!("use count: {}", p4.use_count());
}

fn closure_deleter() {
    let lambda = |ptr: NonNull<Widget>| {
        let widget = unsafe { Box::from_raw(ptr.as_ptr()) };
        log::info!("Closure deleter for Widget {}", widget.id);
    };
    let p5 = unsafe { SharedPtr::from_raw_with(Widget::boxed(3), lambda) };
    log::info!("use count: {}", p5.use_count());
}

fn stateful_deleter() {
    let sd = StatefulDeleter {
        message: "Stateful deleter for".to_string(),
    };
    let p6 = unsafe { SharedPtr::from_raw_with(Widget::boxed(4), sd) };
    log::info!("use count: {}", p6.use_count());
}

fn erased_deleter() {
    let func = DynDeleter::new(|ptr: NonNull<Widget>| {
        let widget = unsafe { Box::from_raw(ptr.as_ptr()) };
        log::info!("Type-erased deleter for Widget {}", widget.id);
    });
    let p7: DynSharedPtr<Widget> = unsafe { SharedPtr::from_raw_with(Widget::boxed(5), func) };
    log::info!("use count: {}", p7.use_count());
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let demos: [(&str, fn()); 5] = [
        ("Default deleter", default_deleter),
        ("Function deleter", function_deleter),
        ("Closure deleter", closure_deleter),
        ("Stateful functor deleter", stateful_deleter),
        ("Type-erased deleter", erased_deleter),
    ];

    for (i, (name, demo)) in demos.iter().enumerate() {
        log::info!("--- Demo {}: {} ---", i + 1, name);
        demo();
    }
}
