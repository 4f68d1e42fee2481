use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

// TbObj lets tasks share testbench objects (scoreboard, coverage, pins, ...).
// Everything runs on the scheduler's thread, so Rc<RefCell> is enough. Never
// hold a borrow across an `.await`.
pub struct TbObj<T>(Rc<RefCell<T>>);

impl<T> TbObj<T> {
    pub fn new(data: T) -> TbObj<T> {
        TbObj(Rc::new(RefCell::new(data)))
    }
    pub fn get(&self) -> Ref<'_, T> {
        (*self.0).borrow()
    }
    pub fn get_mut(&self) -> RefMut<'_, T> {
        (*self.0).borrow_mut()
    }
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.get_mut())
    }
}

impl<T> Clone for TbObj<T> {
    fn clone(&self) -> Self {
        TbObj(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = TbObj::new(1u32);
        let b = a.clone();
        b.with_mut(|v| *v += 41);
        assert_eq!(*a.get(), 42);
    }
}
