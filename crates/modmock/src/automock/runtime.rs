//! JavaScript helpers appended to every automocked module.
//!
//! Function declarations are hoisted, so the epilogue can call them before
//! they appear in the file. Stand-ins never call the original function.

/// Name of the helper that mocks a module object
pub(crate) const MOCK_MODULE_FN: &str = "__modmock_mock_module__";

/// Module-private binding holding the mocked module object
pub(crate) const MOCKED_MODULE_BINDING: &str = "__modmock_module__";

/// Binding that captures `export default <expression>`
pub(crate) const DEFAULT_BINDING: &str = "__modmock_default__";

pub(crate) const RUNTIME: &str = r#"
function __modmock_mock_module__(source, spy) {
  const seen = new Map();
  const mocked = {};
  for (const key of Object.keys(source)) {
    const value = source[key];
    mocked[key] = typeof value === "function" ? __modmock_mock_fn__(value, key, spy, seen) : value;
  }
  return mocked;
}
function __modmock_mock_fn__(original, key, spy, seen) {
  const existing = seen.get(original);
  if (existing !== undefined) return existing;
  const state = { callCount: 0, calls: [], results: [], implementation: undefined };
  const stub = function (...args) {
    state.callCount += 1;
    if (spy) state.calls.push(args);
    try {
      const value = state.implementation === undefined ? undefined : state.implementation.apply(this, args);
      if (spy) state.results.push({ type: "return", value });
      return value;
    } catch (error) {
      if (spy) state.results.push({ type: "throw", value: error });
      throw error;
    }
  };
  seen.set(original, stub);
  const name = original.name && original.name !== "__modmock_default__" ? original.name : key;
  Object.defineProperty(stub, "name", { value: name, configurable: true });
  Object.defineProperty(stub, "length", { value: original.length, configurable: true });
  stub.mock = state;
  stub._isMockFunction = true;
  stub.getMockName = () => key;
  stub.mockImplementation = (implementation) => {
    state.implementation = implementation;
    return stub;
  };
  stub.mockReturnValue = (value) => stub.mockImplementation(() => value);
  stub.mockClear = () => {
    state.callCount = 0;
    state.calls.length = 0;
    state.results.length = 0;
    return stub;
  };
  // Classes keep their shape, inherited members included
  if (original.prototype) {
    __modmock_mock_methods__(original.prototype, stub.prototype, Object.prototype, ["constructor"], spy, seen);
  }
  __modmock_mock_methods__(original, stub, Function.prototype, ["length", "name", "prototype", "arguments", "caller"], spy, seen);
  return stub;
}
function __modmock_mock_methods__(source, target, stop, skip, spy, seen) {
  for (let owner = source; owner && owner !== stop; owner = Object.getPrototypeOf(owner)) {
    for (const key of Object.getOwnPropertyNames(owner)) {
      if (skip.includes(key) || Object.prototype.hasOwnProperty.call(target, key)) continue;
      const descriptor = Object.getOwnPropertyDescriptor(owner, key);
      if (descriptor && typeof descriptor.value === "function") {
        Object.defineProperty(target, key, {
          value: __modmock_mock_fn__(descriptor.value, key, spy, seen),
          writable: true,
          configurable: true,
        });
      }
    }
  }
}
"#;
