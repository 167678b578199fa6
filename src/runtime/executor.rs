//! Tree-walking instruction executor.

use super::{
    control::{Flow, LabelKind},
    frame::ExecutionContext,
    globals::Globals,
    memory::Memory,
    ops,
    stack::Stack,
    Config, RuntimeError, Value,
};
use crate::ast::{Index, Instruction, Module};
use crate::validate::LOG_FUNCTION;
use std::io::Write;

/// Runs functions of one module. Globals and memory persist across calls;
/// the operand stack is reset at the start of each top-level call.
pub struct Interpreter<'m> {
    module: &'m Module,
    config: Config,
    /// Operand stack of the innermost active call.
    stack: Stack,
    globals: Globals,
    memory: Memory,
    /// Positions of the functions currently executing, outermost first.
    call_stack: Vec<usize>,
    /// Active calls plus the `block`, `loop`, `if` and `br_if` conditions
    /// they are executing. Bounded by `max_call_depth`.
    nesting: usize,
    fuel: Option<u64>,
}

impl<'m> Interpreter<'m> {
    /// Set up globals and memory for `module`.
    ///
    /// # Errors
    /// - If the first memory declares more pages than can be addressed
    pub fn new(module: &'m Module, config: Config) -> Result<Self, RuntimeError> {
        let memory = match module.memories.first() {
            Some(declared) => Memory::new(declared.pages)?,
            None => Memory::empty(),
        };

        Ok(Interpreter {
            module,
            stack: Stack::new(),
            globals: Globals::new(&module.globals),
            memory,
            call_stack: Vec::new(),
            nesting: 0,
            fuel: config.fuel,
            config,
        })
    }

    /// Call a function by `$name`, export name or position, with `i32`
    /// arguments bound to its parameters in order.
    ///
    /// Returns the top of the stack when the function declares a result.
    /// After the call, [`stack`](Self::stack) shows the function's final
    /// operand stack.
    pub fn execute_function(&mut self, name: &str, args: &[i32]) -> Result<Option<i32>, RuntimeError> {
        let position = self
            .module
            .find_function(name)
            .ok_or_else(|| RuntimeError::UndefinedFunction(name.to_string()))?;
        let func = &self.module.functions[position];
        if args.len() != func.params.len() {
            return Err(RuntimeError::ArgumentCount {
                function: func.display_name(position),
                expected: func.params.len(),
                actual: args.len(),
            });
        }

        self.stack.clear();
        self.call_stack.clear();
        self.nesting = 0;
        self.fuel = self.config.fuel;

        let args = args.iter().copied().map(Value::I32).collect();
        let result = self.invoke(position, args)?;
        Ok(result.map(|value| value.as_i32()))
    }

    /// Bottom-to-top contents of the operand stack.
    pub fn stack(&self) -> &[Value] {
        self.stack.values()
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn global(&self, index: &Index) -> Result<Value, RuntimeError> {
        self.globals.get(index)
    }

    /// Number of calls currently executing. Zero between top-level calls.
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn remaining_fuel(&self) -> Option<u64> {
        self.fuel
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Run a function body on the current operand stack.
    fn invoke(&mut self, position: usize, args: Vec<Value>) -> Result<Option<Value>, RuntimeError> {
        let module = self.module;
        let func = &module.functions[position];
        let mut context = ExecutionContext::new(position, func, args);

        self.enter()?;
        self.call_stack.push(position);
        let outcome = self.execute_sequence(&mut context, &func.body);
        self.call_stack.pop();
        self.leave();

        let returned = match outcome? {
            Flow::Return(value) => value,
            Flow::Normal | Flow::Branch(0) => self.stack.peek().copied(),
            Flow::Branch(depth) => return Err(RuntimeError::UndefinedLabel(depth.to_string())),
        };
        if func.results.is_empty() {
            Ok(None)
        } else {
            returned.map(Some).ok_or(RuntimeError::StackUnderflow)
        }
    }

    /// `call`: move the arguments off the caller's stack, run the callee on
    /// a fresh stack, then push its result for the caller.
    fn call(&mut self, callee: &Index) -> Result<(), RuntimeError> {
        let position = match self.module.function_index(callee) {
            Some(position) => position,
            None if callee.name() == Some(LOG_FUNCTION) => return self.log(),
            None => return Err(RuntimeError::UndefinedFunction(callee.to_string())),
        };

        let params = self.module.functions[position].params.len();
        let args = self.stack.pop_n(params)?;

        let caller = std::mem::take(&mut self.stack);
        let result = self.invoke(position, args);
        self.stack = caller;

        if let Some(value) = result? {
            self.stack.push(value);
        }
        Ok(())
    }

    /// The built-in `$log`: pop one value and print it.
    fn log(&mut self) -> Result<(), RuntimeError> {
        let value = self.stack.pop_i32()?;
        writeln!(self.config.log, "log: {}", value)?;
        Ok(())
    }

    // ========================================================================
    // Instructions
    // ========================================================================

    fn execute_sequence(
        &mut self,
        context: &mut ExecutionContext,
        instructions: &'m [Instruction],
    ) -> Result<Flow, RuntimeError> {
        for instruction in instructions {
            match self.execute_instruction(context, instruction)? {
                Flow::Normal => continue,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_instruction(
        &mut self,
        context: &mut ExecutionContext,
        instruction: &'m Instruction,
    ) -> Result<Flow, RuntimeError> {
        self.consume_fuel()?;
        if self.config.trace {
            self.trace(context, instruction)?;
        }

        let stack = &mut self.stack;
        match instruction {
            Instruction::I32Const(value) => ops::numeric::i32_const(stack, *value)?,
            Instruction::I32Add => ops::numeric::i32_add(stack)?,
            Instruction::I32Sub => ops::numeric::i32_sub(stack)?,
            Instruction::I32Mul => ops::numeric::i32_mul(stack)?,
            Instruction::I32DivS => ops::numeric::i32_div_s(stack)?,
            Instruction::I32GeU => ops::comparison::i32_ge_u(stack)?,
            Instruction::I32GtS => ops::comparison::i32_gt_s(stack)?,
            Instruction::I32LtS => ops::comparison::i32_lt_s(stack)?,
            Instruction::I32LtU => ops::comparison::i32_lt_u(stack)?,
            Instruction::I32Clz => ops::bitwise::i32_clz(stack)?,
            Instruction::LocalGet(index) => ops::variable::local_get(stack, context, index)?,
            Instruction::LocalSet(index) => ops::variable::local_set(stack, context, index)?,
            Instruction::LocalTee(index) => ops::variable::local_tee(stack, context, index)?,
            Instruction::GlobalGet(index) => ops::variable::global_get(stack, &self.globals, index)?,
            Instruction::GlobalSet(index) => ops::variable::global_set(stack, &mut self.globals, index)?,
            Instruction::I32Load(arg) => ops::memory::i32_load(stack, &self.memory, arg)?,
            Instruction::I32Store(arg) => ops::memory::i32_store(stack, &mut self.memory, arg)?,
            Instruction::Nop => {}

            Instruction::Block { label, body } => {
                return self.execute_block(context, LabelKind::Block, label.as_ref(), body);
            }
            Instruction::Loop { label, body } => {
                return self.execute_loop(context, label.as_ref(), body);
            }
            Instruction::If { label, then, else_ } => {
                let condition = stack.pop_i32()?;
                let arm = if condition != 0 { then } else { else_ };
                return self.execute_block(context, LabelKind::If, label.as_ref(), arm);
            }
            Instruction::Br(target) => return resolve_branch(context, target).map(Flow::Branch),
            Instruction::BrIf { target, condition } => {
                self.enter()?;
                let flow = self.execute_sequence(context, condition);
                self.leave();
                match flow? {
                    Flow::Normal => {}
                    other => return Ok(other),
                }
                if self.stack.pop_i32()? != 0 {
                    return resolve_branch(context, target).map(Flow::Branch);
                }
            }
            Instruction::Call(callee) => self.call(callee)?,
            Instruction::Return => return Ok(Flow::Return(stack.peek().copied())),
        }
        Ok(Flow::Normal)
    }

    /// `block` and `if`: a branch to this construct completes it.
    fn execute_block(
        &mut self,
        context: &mut ExecutionContext,
        kind: LabelKind,
        label: Option<&Index>,
        body: &'m [Instruction],
    ) -> Result<Flow, RuntimeError> {
        self.enter()?;
        context.labels.push(kind, label);
        let result = self.execute_sequence(context, body);
        context.labels.pop();
        self.leave();

        match result? {
            Flow::Branch(0) => Ok(Flow::Normal),
            Flow::Branch(depth) => Ok(Flow::Branch(depth - 1)),
            other => Ok(other),
        }
    }

    /// `loop`: a branch to this construct runs the body again.
    fn execute_loop(
        &mut self,
        context: &mut ExecutionContext,
        label: Option<&Index>,
        body: &'m [Instruction],
    ) -> Result<Flow, RuntimeError> {
        self.enter()?;
        context.labels.push(LabelKind::Loop, label);
        let result = loop {
            match self.execute_sequence(context, body) {
                Ok(Flow::Branch(0)) => continue,
                other => break other,
            }
        };
        context.labels.pop();
        self.leave();

        match result? {
            Flow::Branch(depth) => Ok(Flow::Branch(depth - 1)),
            other => Ok(other),
        }
    }

    /// Open one level of native recursion, failing once `max_call_depth`
    /// levels are active.
    fn enter(&mut self) -> Result<(), RuntimeError> {
        if self.nesting >= self.config.max_call_depth {
            return Err(RuntimeError::CallStackOverflow);
        }
        self.nesting += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn consume_fuel(&mut self) -> Result<(), RuntimeError> {
        if let Some(fuel) = self.fuel.as_mut() {
            if *fuel == 0 {
                return Err(RuntimeError::FuelExhausted);
            }
            *fuel -= 1;
        }
        Ok(())
    }

    fn trace(&mut self, context: &ExecutionContext, instruction: &Instruction) -> Result<(), RuntimeError> {
        let func = self.module.functions[context.function].display_name(context.function);
        let values: Vec<i32> = self.stack.values().iter().map(Value::as_i32).collect();
        writeln!(
            self.config.trace_sink,
            "{:indent$}{} {} {:?}",
            "",
            func,
            instruction.opcode(),
            values,
            indent = self.call_stack.len().saturating_sub(1) * 2
        )?;
        Ok(())
    }
}

fn resolve_branch(context: &ExecutionContext, target: &Index) -> Result<u32, RuntimeError> {
    context
        .labels
        .resolve(target)
        .ok_or_else(|| RuntimeError::UndefinedLabel(target.to_string()))
}
