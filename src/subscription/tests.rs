use super::*;
use assert_call::{call, CallRecorder};
use std::cell::Cell;

use crate::Ref;

fn on_unsubscribe(rc: Rc<Cell<i32>>) {
    call!("{}", rc.get());
}

#[test]
fn from_weak_fn_calls_when_alive() {
    let mut cr = CallRecorder::new();
    let rc = Rc::new(Cell::new(9));
    {
        let _s = Subscription::from_weak_fn(Rc::downgrade(&rc), on_unsubscribe);
        cr.verify(());
    }
    cr.verify("9");
}

#[test]
fn from_weak_fn_noop_when_dead() {
    let mut cr = CallRecorder::new();
    let rc = Rc::new(Cell::new(3));
    let s = Subscription::from_weak_fn(Rc::downgrade(&rc), on_unsubscribe);
    drop(rc);
    drop(s);
    cr.verify(());
}

#[test]
fn watch_subscription_outlives_ref() {
    let mut cr = CallRecorder::new();
    let r = Ref::new(1);
    let s = r.watch(|value| call!("{:?}", value));
    drop(r);
    drop(s);
    cr.verify(());
}
